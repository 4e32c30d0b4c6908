//! Live microphone capture using CPAL (Cross-Platform Audio Library).
//!
//! The capture callback runs on the audio subsystem's real-time thread and
//! must never block: its only duty is copying the delivered block and
//! pushing complete frames onto the bounded frame queue with `try_send`.
//! Overflow is counted and surfaced periodically, never waited out.

use crate::audio::FrameSource;
use crate::audio::frame::Frame;
use crate::defaults;
use crate::error::{LivescribeError, Result};
use crossbeam_channel::Sender;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices.
///
/// Preferred devices (PipeWire/PulseAudio) are marked with "\[recommended\]".
///
/// # Errors
/// Returns `LivescribeError::AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| LivescribeError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| LivescribeError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is owned by the `MicSource` and only touched from the
/// thread that calls `start`/`stop`; it never crosses threads concurrently.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Live microphone frame source.
///
/// Captures 16-bit PCM mono at the configured rate and pushes fixed-size
/// frames onto the frame queue. Tries the preferred i16 format first, then
/// falls back to f32 with conversion.
pub struct MicSource {
    device: cpal::Device,
    sender: Option<Sender<Frame>>,
    stream: Option<SendableStream>,
    dropped_frames: Arc<AtomicU64>,
    sample_rate: u32,
    frame_samples: usize,
}

impl MicSource {
    /// Create a new microphone source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default.
    /// * `sender` - Frame queue producer handed to the capture callback.
    /// * `frame_samples` - Fixed frame size in samples.
    ///
    /// # Errors
    /// Device lookup failure is the pipeline's only fatal startup error.
    pub fn new(
        device_name: Option<&str>,
        sender: Sender<Frame>,
        sample_rate: u32,
        frame_samples: usize,
    ) -> Result<Self> {
        let device = with_suppressed_stderr(|| match device_name {
            Some(name) => {
                let host = cpal::default_host();
                let devices = host
                    .input_devices()
                    .map_err(|e| LivescribeError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        return Ok(dev);
                    }
                }
                Err(LivescribeError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            }
            None => get_best_default_device(),
        })?;

        Ok(Self {
            device,
            sender: Some(sender),
            stream: None,
            dropped_frames: Arc::new(AtomicU64::new(0)),
            sample_rate,
            frame_samples: frame_samples.max(1),
        })
    }

    /// Number of frames dropped because the frame queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Build the input stream, preferring i16 and falling back to f32.
    fn build_stream(&self, sender: Sender<Frame>) -> Result<cpal::Stream> {
        let config = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: self.sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            // Overflow/underflow and other stream status problems are
            // non-fatal; capture continues.
            warn!(error = %err, "audio stream status");
        };

        // i16 path — PipeWire/PulseAudio convert transparently
        let mut pusher = FramePusher::new(sender.clone(), self.frame_samples, &self.dropped_frames);
        if let Ok(stream) = self.device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                pusher.push(data);
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // f32 fallback for devices that only expose float formats
        let mut pusher = FramePusher::new(sender, self.frame_samples, &self.dropped_frames);
        self.device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data
                        .iter()
                        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                        .collect();
                    pusher.push(&converted);
                },
                err_callback,
                None,
            )
            .map_err(|e| LivescribeError::AudioCapture {
                message: format!("Failed to build input stream: {}", e),
            })
    }
}

impl FrameSource for MicSource {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already started
        }

        let sender = self
            .sender
            .take()
            .ok_or_else(|| LivescribeError::AudioCapture {
                message: "microphone source already stopped".to_string(),
            })?;

        let stream = self.build_stream(sender)?;
        stream.play().map_err(|e| LivescribeError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        if let Ok(name) = self.device.name() {
            info!(device = %name, sample_rate = self.sample_rate, "audio capture started");
        }

        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(sendable_stream) = self.stream.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| LivescribeError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }

        let dropped = self.dropped_frames();
        if dropped > 0 {
            warn!(dropped, "frames dropped due to full frame queue");
        }
        Ok(())
    }
}

/// Accumulates callback blocks and emits fixed-size frames.
///
/// Lives inside the capture callback closure; `push` only copies samples
/// and calls `try_send`, so the real-time thread never blocks.
struct FramePusher {
    sender: Sender<Frame>,
    frame_samples: usize,
    pending: Vec<i16>,
    dropped: Arc<AtomicU64>,
}

impl FramePusher {
    fn new(sender: Sender<Frame>, frame_samples: usize, dropped: &Arc<AtomicU64>) -> Self {
        Self {
            sender,
            frame_samples,
            pending: Vec::with_capacity(frame_samples * 2),
            dropped: Arc::clone(dropped),
        }
    }

    fn push(&mut self, data: &[i16]) {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.frame_samples {
            let frame: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            if self.sender.try_send(Frame::new(frame)).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
