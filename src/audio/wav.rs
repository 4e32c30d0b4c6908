//! WAV persistence for speech chunks and WAV file replay as a frame source.

use crate::audio::FrameSource;
use crate::audio::frame::Frame;
use crate::defaults;
use crate::error::{LivescribeError, Result};
use crossbeam_channel::Sender;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

/// Path of a chunk WAV file inside the session audio directory.
pub fn chunk_wav_path(audio_dir: &Path, chunk_index: u64) -> PathBuf {
    audio_dir.join(format!("chunk_{:04}.wav", chunk_index))
}

/// Write a chunk as mono 16-bit PCM WAV at the given sample rate.
pub fn save_chunk(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: defaults::CHANNELS,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let persist_err = |message: String| LivescribeError::Persistence {
        path: path.display().to_string(),
        message,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|e| persist_err(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| persist_err(e.to_string()))?;
    }
    writer.finalize().map_err(|e| persist_err(e.to_string()))?;
    Ok(())
}

/// Audio source that replays a WAV file into the frame queue.
///
/// Supports arbitrary sample rates and channels, downmixing to mono and
/// resampling to the target rate. Used for offline runs and tests; frames
/// are pushed with blocking sends, so the bounded frame queue applies
/// backpressure instead of dropping.
pub struct WavSource {
    samples: Option<Vec<i16>>,
    frame_samples: usize,
    sender: Option<Sender<Frame>>,
    handle: Option<JoinHandle<()>>,
}

impl WavSource {
    /// Create from a WAV file on disk.
    pub fn open(path: &Path, sender: Sender<Frame>, frame_samples: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(Box::new(file), sender, frame_samples)
    }

    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(
        reader: Box<dyn Read + Send>,
        sender: Sender<Frame>,
        frame_samples: usize,
    ) -> Result<Self> {
        let samples = decode_wav(reader, defaults::SAMPLE_RATE)?;
        Ok(Self {
            samples: Some(samples),
            frame_samples: frame_samples.max(1),
            sender: Some(sender),
            handle: None,
        })
    }

    /// Total decoded samples (before replay starts).
    pub fn len_samples(&self) -> usize {
        self.samples.as_ref().map(Vec::len).unwrap_or(0)
    }
}

impl FrameSource for WavSource {
    /// Spawns the replay thread. The frame sender is dropped when the file
    /// is exhausted, which lets downstream stages drain and finish.
    fn start(&mut self) -> Result<()> {
        let samples = self
            .samples
            .take()
            .ok_or_else(|| LivescribeError::AudioCapture {
                message: "WAV source already started".to_string(),
            })?;
        let sender = self
            .sender
            .take()
            .ok_or_else(|| LivescribeError::AudioCapture {
                message: "WAV source already started".to_string(),
            })?;
        let frame_samples = self.frame_samples;

        self.handle = Some(std::thread::spawn(move || {
            for block in samples.chunks(frame_samples) {
                if sender.send(Frame::new(block.to_vec())).is_err() {
                    // Receiver gone; pipeline is shutting down.
                    break;
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            return Err(LivescribeError::AudioCapture {
                message: "WAV replay thread panicked".to_string(),
            });
        }
        Ok(())
    }
}

/// Decode a WAV stream to mono i16 at the target rate.
fn decode_wav(reader: Box<dyn Read + Send>, target_rate: u32) -> Result<Vec<i16>> {
    let mut wav_reader =
        hound::WavReader::new(reader).map_err(|e| LivescribeError::AudioCapture {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

    let spec = wav_reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    let raw_samples: Vec<i16> = wav_reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LivescribeError::AudioCapture {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    // Downmix by averaging channels
    let mono_samples = if source_channels > 1 {
        raw_samples
            .chunks_exact(source_channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / source_channels as i32) as i16
            })
            .collect()
    } else {
        raw_samples
    };

    if source_rate != target_rate {
        Ok(resample(&mono_samples, source_rate, target_rate))
    } else {
        Ok(mono_samples)
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn chunk_wav_path_is_zero_padded() {
        let dir = Path::new("/tmp/audio");
        assert_eq!(
            chunk_wav_path(dir, 7),
            PathBuf::from("/tmp/audio/chunk_0007.wav")
        );
        assert_eq!(
            chunk_wav_path(dir, 1234),
            PathBuf::from("/tmp/audio/chunk_1234.wav")
        );
    }

    #[test]
    fn save_chunk_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = chunk_wav_path(tmp.path(), 1);
        let samples: Vec<i16> = vec![100, -200, 300, -400, 500];

        save_chunk(&path, &samples, 16000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);

        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn save_chunk_to_missing_directory_is_persistence_error() {
        let result = save_chunk(
            Path::new("/nonexistent/dir/chunk_0001.wav"),
            &[0i16; 10],
            16000,
        );
        assert!(matches!(
            result,
            Err(LivescribeError::Persistence { .. })
        ));
    }

    #[test]
    fn wav_source_replays_all_samples_in_frames() {
        let samples = vec![1i16; 5000];
        let data = make_wav_data(16000, 1, &samples);
        let (tx, rx) = unbounded();

        let mut source = WavSource::from_reader(Box::new(Cursor::new(data)), tx, 1600).unwrap();
        assert_eq!(source.len_samples(), 5000);
        source.start().unwrap();
        source.stop().unwrap();

        let frames: Vec<Frame> = rx.iter().collect();
        assert_eq!(frames.len(), 4); // 1600 + 1600 + 1600 + 200
        assert_eq!(frames[0].samples.len(), 1600);
        assert_eq!(frames[3].samples.len(), 200);
    }

    #[test]
    fn wav_source_drops_sender_at_eof() {
        let data = make_wav_data(16000, 1, &[1i16; 100]);
        let (tx, rx) = unbounded();

        let mut source = WavSource::from_reader(Box::new(Cursor::new(data)), tx, 50).unwrap();
        source.start().unwrap();
        source.stop().unwrap();

        // Channel must be disconnected after replay completes
        assert_eq!(rx.iter().count(), 2);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn wav_source_cannot_start_twice() {
        let data = make_wav_data(16000, 1, &[1i16; 10]);
        let (tx, _rx) = unbounded();

        let mut source = WavSource::from_reader(Box::new(Cursor::new(data)), tx, 10).unwrap();
        source.start().unwrap();
        assert!(source.start().is_err());
        source.stop().unwrap();
    }

    #[test]
    fn decode_stereo_downmixes_to_mono() {
        // Stereo pairs: (100, 200), (300, 400), (500, 600)
        let data = make_wav_data(16000, 2, &[100i16, 200, 300, 400, 500, 600]);
        let decoded = decode_wav(Box::new(Cursor::new(data)), 16000).unwrap();
        assert_eq!(decoded, vec![150i16, 350, 550]);
    }

    #[test]
    fn decode_48khz_resamples_to_16khz() {
        let data = make_wav_data(48000, 1, &vec![1000i16; 48000]);
        let decoded = decode_wav(Box::new(Cursor::new(data)), 16000).unwrap();
        assert!(decoded.len() >= 15900 && decoded.len() <= 16100);
        assert!(decoded.iter().all(|&s| (900..=1100).contains(&s)));
    }

    #[test]
    fn decode_invalid_data_is_error() {
        let result = decode_wav(Box::new(Cursor::new(vec![0u8, 1, 2, 3])), 16000);
        assert!(matches!(result, Err(LivescribeError::AudioCapture { .. })));
    }

    #[test]
    fn resample_identity_same_rate() {
        let samples = vec![100i16, 200, 300];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_halves_and_doubles() {
        assert_eq!(resample(&vec![0i16; 3200], 16000, 8000).len(), 1600);
        assert_eq!(resample(&[0i16, 1000, 2000], 8000, 16000).len(), 6);
    }

    #[test]
    fn resample_handles_edge_cases() {
        assert_eq!(resample(&[], 16000, 8000).len(), 0);
        let single = resample(&[100i16], 16000, 8000);
        assert_eq!(single, vec![100]);
    }
}
