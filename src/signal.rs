//! Synthetic PPG waveform: a sinusoid around the ADC midpoint plus gaussian noise.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

/// Largest value a 12-bit ADC sample can take.
pub const SAMPLE_MAX: u16 = 0x0FFF;

/// Default DC level: the middle of the 12-bit range.
pub const DEFAULT_MIDPOINT: f64 = 2048.0;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("sampling rate must be positive and finite, got {0}")]
    InvalidSamplingRate(f64),
    #[error("noise magnitude must be non-negative and finite, got {0}")]
    InvalidNoise(f64),
}

/// Waveform parameters shared by every window of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    pub sampling_rate_hz: f64,
    pub frequency_hz: f64,
    pub noise: f64,
    pub midpoint: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 100.0,
            frequency_hz: 1.2,
            noise: 150.0,
            midpoint: DEFAULT_MIDPOINT,
        }
    }
}

/// Generate `n_samples` 12-bit samples of
/// `midpoint + amplitude * sin(2π f i / fs) + N(0, noise)`, rounded and clamped to `0..=4095`.
pub fn generate_ppg_signal<R: Rng + ?Sized>(
    params: &SignalParams,
    n_samples: usize,
    amplitude: f64,
    rng: &mut R,
) -> Result<Vec<u16>, SignalError> {
    if !params.sampling_rate_hz.is_finite() || params.sampling_rate_hz <= 0.0 {
        return Err(SignalError::InvalidSamplingRate(params.sampling_rate_hz));
    }
    if !params.noise.is_finite() || params.noise < 0.0 {
        return Err(SignalError::InvalidNoise(params.noise));
    }
    let noise = Normal::new(0.0, params.noise).map_err(|_| SignalError::InvalidNoise(params.noise))?;

    let omega = 2.0 * std::f64::consts::PI * params.frequency_hz / params.sampling_rate_hz;
    let samples = (0..n_samples)
        .map(|i| {
            let clean = params.midpoint + amplitude * (omega * i as f64).sin();
            quantize(clean + noise.sample(rng))
        })
        .collect();
    Ok(samples)
}

/// Round to the nearest code and clamp into the 12-bit range.
pub fn quantize(value: f64) -> u16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, SAMPLE_MAX as f64) as u16
}
