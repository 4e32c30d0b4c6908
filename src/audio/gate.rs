//! Speech/silence gate for audio chunks.
//!
//! Two-stage classification, stateless per call: a cheap RMS energy
//! prefilter short-circuits obviously silent chunks before the more
//! expensive per-sub-frame voice pass runs.

use crate::audio::vad::{self, SubframeVad, VadConfig, calculate_rms};
use crate::defaults;
use tracing::{debug, warn};

/// Why a chunk was classified as not-speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// RMS energy below the prefilter threshold.
    Rms,
    /// Voiced sub-frame ratio below the silence threshold.
    Vad,
    /// Empty or malformed chunk.
    Error,
}

impl SkipReason {
    /// Stable key used in stats and log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Rms => "rms",
            SkipReason::Vad => "vad",
            SkipReason::Error => "error",
        }
    }
}

/// Outcome of gating one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechDecision {
    /// The chunk contains speech and should be persisted and dispatched.
    Speech,
    /// The chunk is silent; carries the reason it was rejected.
    Silent { reason: SkipReason },
}

impl SpeechDecision {
    pub fn is_speech(&self) -> bool {
        matches!(self, SpeechDecision::Speech)
    }
}

/// Configuration for the speech gate.
#[derive(Debug, Clone, Copy)]
pub struct SpeechGateConfig {
    /// RMS prefilter cutoff on normalized samples.
    pub rms_threshold: f32,
    /// Minimum voiced sub-frame ratio for a speech classification.
    /// Non-strict: a ratio exactly at the threshold counts as speech.
    pub silence_threshold: f64,
    /// Sub-frame duration for the voice pass; clamped to 10/20/30 ms.
    pub vad_frame_ms: u32,
    /// Voice detector configuration.
    pub vad: VadConfig,
    /// Sample rate of incoming chunks.
    pub sample_rate: u32,
}

impl Default for SpeechGateConfig {
    fn default() -> Self {
        Self {
            rms_threshold: defaults::RMS_PREFILTER_THRESHOLD,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            vad_frame_ms: defaults::VAD_FRAME_MS,
            vad: VadConfig::default(),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

/// Stateless speech/silence classifier for whole chunks.
pub struct SpeechGate {
    config: SpeechGateConfig,
    vad: SubframeVad,
    /// Clamped sub-frame length in samples.
    subframe_samples: usize,
}

impl SpeechGate {
    /// Creates a new gate. An unsupported sub-frame duration is clamped to
    /// 30 ms and logged once here rather than on every call.
    pub fn new(config: SpeechGateConfig) -> Self {
        let frame_ms = vad::clamp_frame_ms(config.vad_frame_ms);
        if frame_ms != config.vad_frame_ms {
            warn!(
                configured_ms = config.vad_frame_ms,
                effective_ms = frame_ms,
                "unsupported VAD sub-frame duration, clamped"
            );
        }
        let subframe_samples = (config.sample_rate as u64 * frame_ms as u64 / 1000) as usize;

        Self {
            config,
            vad: SubframeVad::new(config.vad),
            subframe_samples,
        }
    }

    /// Classifies a chunk's samples as speech or silence.
    pub fn classify(&self, samples: &[i16]) -> SpeechDecision {
        if samples.is_empty() {
            debug!("empty chunk rejected");
            return SpeechDecision::Silent {
                reason: SkipReason::Error,
            };
        }
        if samples.len() < self.subframe_samples {
            debug!(
                samples = samples.len(),
                subframe = self.subframe_samples,
                "chunk shorter than one VAD sub-frame, rejected"
            );
            return SpeechDecision::Silent {
                reason: SkipReason::Error,
            };
        }

        let rms = calculate_rms(samples);
        if rms < self.config.rms_threshold {
            debug!(
                rms,
                threshold = self.config.rms_threshold,
                "chunk below RMS prefilter"
            );
            return SpeechDecision::Silent {
                reason: SkipReason::Rms,
            };
        }

        let ratio = self.voiced_ratio(samples);
        debug!(
            rms,
            voiced_ratio = ratio,
            threshold = self.config.silence_threshold,
            "VAD pass complete"
        );
        if ratio >= self.config.silence_threshold {
            SpeechDecision::Speech
        } else {
            SpeechDecision::Silent {
                reason: SkipReason::Vad,
            }
        }
    }

    /// RMS energy of a chunk (exposed for skip log lines).
    pub fn rms(&self, samples: &[i16]) -> f32 {
        calculate_rms(samples)
    }

    /// Fraction of complete sub-frames classified as voiced.
    fn voiced_ratio(&self, samples: &[i16]) -> f64 {
        let mut voiced = 0usize;
        let mut total = 0usize;

        let mut offset = 0;
        while offset + self.subframe_samples <= samples.len() {
            let subframe = &samples[offset..offset + self.subframe_samples];
            if self.vad.is_voiced(subframe) {
                voiced += 1;
            }
            total += 1;
            offset += self.subframe_samples;
        }

        if total == 0 {
            return 0.0;
        }
        voiced as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SpeechGate {
        SpeechGate::new(SpeechGateConfig::default())
    }

    /// A low-frequency tone loud enough to pass both stages.
    fn make_voiced(count: usize) -> Vec<i16> {
        (0..count)
            .map(|i| {
                let phase = (i % 160) as f32 / 160.0;
                (4000.0 * (phase * std::f32::consts::TAU).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn test_empty_chunk_is_error() {
        assert_eq!(
            gate().classify(&[]),
            SpeechDecision::Silent {
                reason: SkipReason::Error
            }
        );
    }

    #[test]
    fn test_short_chunk_is_error() {
        // Shorter than one 30ms sub-frame (480 samples at 16kHz)
        assert_eq!(
            gate().classify(&[1000i16; 100]),
            SpeechDecision::Silent {
                reason: SkipReason::Error
            }
        );
    }

    #[test]
    fn test_quiet_chunk_short_circuits_on_rms() {
        // RMS ≈ 50/32767 ≈ 0.0015, below the 0.003 prefilter. The reason
        // proves the sub-frame pass never ran.
        let quiet = vec![50i16; 32000];
        assert_eq!(
            gate().classify(&quiet),
            SpeechDecision::Silent {
                reason: SkipReason::Rms
            }
        );
    }

    #[test]
    fn test_voiced_chunk_is_speech() {
        assert_eq!(gate().classify(&make_voiced(32000)), SpeechDecision::Speech);
    }

    #[test]
    fn test_loud_hiss_is_vad_rejected() {
        // Above the RMS prefilter but alternating-sign: every sub-frame has
        // a zero-crossing rate of ~1.0, so the voice pass rejects it.
        let hiss: Vec<i16> = (0..32000)
            .map(|i| if i % 2 == 0 { 2000 } else { -2000 })
            .collect();
        assert_eq!(
            gate().classify(&hiss),
            SpeechDecision::Silent {
                reason: SkipReason::Vad
            }
        );
    }

    #[test]
    fn test_ratio_exactly_at_threshold_is_speech() {
        // One voiced sub-frame out of four with threshold 0.25: the
        // boundary is non-strict, so this is speech.
        let config = SpeechGateConfig {
            silence_threshold: 0.25,
            ..Default::default()
        };
        let gate = SpeechGate::new(config);

        let mut samples = make_voiced(480);
        samples.extend(vec![0i16; 480 * 3]);
        // Keep overall RMS above the prefilter: the voiced quarter dominates.
        assert!(calculate_rms(&samples) >= 0.003);

        assert_eq!(gate.classify(&samples), SpeechDecision::Speech);
    }

    #[test]
    fn test_ratio_below_threshold_is_vad_silent() {
        let config = SpeechGateConfig {
            silence_threshold: 0.5,
            ..Default::default()
        };
        let gate = SpeechGate::new(config);

        // One voiced sub-frame out of four = 0.25 < 0.5
        let mut samples = make_voiced(480);
        samples.extend(vec![0i16; 480 * 3]);

        assert_eq!(
            gate.classify(&samples),
            SpeechDecision::Silent {
                reason: SkipReason::Vad
            }
        );
    }

    #[test]
    fn test_unsupported_subframe_duration_clamps_to_30ms() {
        let config = SpeechGateConfig {
            vad_frame_ms: 17,
            ..Default::default()
        };
        let gate = SpeechGate::new(config);
        // 30ms at 16kHz
        assert_eq!(gate.subframe_samples, 480);
    }

    #[test]
    fn test_supported_subframe_durations_kept() {
        for (ms, samples) in [(10, 160), (20, 320), (30, 480)] {
            let gate = SpeechGate::new(SpeechGateConfig {
                vad_frame_ms: ms,
                ..Default::default()
            });
            assert_eq!(gate.subframe_samples, samples);
        }
    }

    #[test]
    fn test_skip_reason_keys() {
        assert_eq!(SkipReason::Rms.as_str(), "rms");
        assert_eq!(SkipReason::Vad.as_str(), "vad");
        assert_eq!(SkipReason::Error.as_str(), "error");
    }

    #[test]
    fn test_decision_is_speech() {
        assert!(SpeechDecision::Speech.is_speech());
        assert!(
            !SpeechDecision::Silent {
                reason: SkipReason::Rms
            }
            .is_speech()
        );
    }
}
