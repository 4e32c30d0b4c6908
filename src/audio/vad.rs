//! Per-sub-frame voice activity detection.
//!
//! A lightweight binary voice/no-voice classifier combining signal energy
//! with zero-crossing rate. Voiced speech concentrates energy at low
//! crossing rates; broadband noise and hiss cross the zero line far more
//! often at comparable energy.

/// Supported sub-frame durations in milliseconds.
pub const SUPPORTED_FRAME_MS: [u32; 3] = [10, 20, 30];

/// Fallback sub-frame duration when an unsupported value is configured.
pub const FALLBACK_FRAME_MS: u32 = 30;

/// Configuration for the sub-frame voice detector.
#[derive(Debug, Clone, Copy)]
pub struct VadConfig {
    /// Aggressiveness, 0 (most sensitive) to 3 (least). Out-of-range
    /// values are clamped.
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            mode: crate::defaults::VAD_MODE,
        }
    }
}

/// Binary voice/no-voice classifier for fixed-duration sub-frames.
#[derive(Debug, Clone, Copy)]
pub struct SubframeVad {
    /// Minimum normalized RMS for a sub-frame to be voiced.
    energy_floor: f32,
    /// Maximum zero-crossing rate for a sub-frame to be voiced.
    zcr_ceiling: f32,
}

impl SubframeVad {
    /// Creates a detector for the given configuration.
    pub fn new(config: VadConfig) -> Self {
        let mode = config.mode.min(3);
        // Higher aggressiveness demands more energy and a cleaner
        // (lower-crossing) signal before calling a sub-frame voiced.
        let (energy_floor, zcr_ceiling) = match mode {
            0 => (0.005, 0.60),
            1 => (0.010, 0.50),
            2 => (0.020, 0.40),
            _ => (0.040, 0.30),
        };
        Self {
            energy_floor,
            zcr_ceiling,
        }
    }

    /// Classifies one sub-frame as voiced or not.
    pub fn is_voiced(&self, subframe: &[i16]) -> bool {
        if subframe.is_empty() {
            return false;
        }
        if calculate_rms(subframe) < self.energy_floor {
            return false;
        }
        zero_crossing_rate(subframe) <= self.zcr_ceiling
    }
}

impl Default for SubframeVad {
    fn default() -> Self {
        Self::new(VadConfig::default())
    }
}

/// Clamp a sub-frame duration to the supported set.
///
/// Returns the value unchanged when it is one of 10/20/30 ms, otherwise the
/// 30 ms fallback.
pub fn clamp_frame_ms(frame_ms: u32) -> u32 {
    if SUPPORTED_FRAME_MS.contains(&frame_ms) {
        frame_ms
    } else {
        FALLBACK_FRAME_MS
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// # Returns
/// Normalized RMS value (0.0 to 1.0), where:
/// - 0.0 represents silence
/// - ~0.707 represents a full-scale sine wave
/// - 1.0 represents maximum amplitude
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}

/// Fraction of adjacent sample pairs whose signs differ.
pub fn zero_crossing_rate(samples: &[i16]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0) != (pair[1] >= 0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}
