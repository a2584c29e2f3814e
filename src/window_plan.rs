//! Precomputed measurement windows replayed to the MCU.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ChannelAmplitudes, Config};
use crate::signal::{SignalError, SignalParams, generate_ppg_signal};

/// LED channel a window is acquired on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Channel {
    #[serde(rename = "R")]
    Red,
    #[serde(rename = "IR")]
    Infrared,
}

impl Channel {
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Red => "R",
            Channel::Infrared => "IR",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub channel: Channel,
    pub amplitude: f64,
    pub samples: Vec<u16>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Ordered, immutable list of windows for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPlan {
    windows: Vec<Window>,
    samples_per_window: usize,
}

impl WindowPlan {
    /// Build `window_count` windows, cycling through `channel_order` for the labels.
    pub fn build<R: Rng + ?Sized>(
        params: &SignalParams,
        channel_order: &[Channel],
        amplitudes: &ChannelAmplitudes,
        window_count: usize,
        samples_per_window: usize,
        rng: &mut R,
    ) -> Result<Self, SignalError> {
        let mut windows = Vec::with_capacity(window_count);
        for channel in channel_order.iter().copied().cycle().take(window_count) {
            let amplitude = amplitudes.for_channel(channel);
            let samples = generate_ppg_signal(params, samples_per_window, amplitude, rng)?;
            windows.push(Window { channel, amplitude, samples });
        }
        Ok(Self { windows, samples_per_window })
    }

    pub fn from_config<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> Result<Self, SignalError> {
        let acq = &config.acquisition;
        let params = SignalParams {
            sampling_rate_hz: acq.sampling_rate_hz,
            frequency_hz: config.signal.frequency_hz,
            noise: config.signal.noise,
            midpoint: config.signal.midpoint,
        };
        Self::build(
            &params,
            &acq.channel_order,
            &config.signal.amplitude,
            acq.window_count,
            acq.samples_per_window(),
            rng,
        )
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn window(&self, index: usize) -> Option<&Window> {
        self.windows.get(index)
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn samples_per_window(&self) -> usize {
        self.samples_per_window
    }

    pub fn total_samples(&self) -> usize {
        self.windows.iter().map(Window::len).sum()
    }

    /// All samples in delivery order.
    pub fn iter_samples(&self) -> impl Iterator<Item = u16> + '_ {
        self.windows.iter().flat_map(|w| w.samples.iter().copied())
    }
}
