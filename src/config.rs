//! Simulator configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! bench defaults: 100 Hz sampling, six 5 s windows alternating `R`/`IR`,
//! 150 ms settling between windows.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baud = 115200
//! read_timeout_ms = 1000
//!
//! [acquisition]
//! sampling_rate_hz = 100.0
//! window_duration_s = 5.0
//! settling_time_s = 0.150
//! window_count = 6
//! channel_order = ["R", "IR", "R", "IR", "R", "IR"]
//!
//! [signal]
//! frequency_hz = 1.2
//! noise = 150.0
//! seed = 42
//!
//! [signal.amplitude]
//! R = 900.0
//! IR = 1100.0
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::window_plan::Channel;

/// Upper bound on the samples a plan may hold across all windows.
pub const MAX_PLAN_SAMPLES: usize = 10_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Endpoint settings for the link to the MCU.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud: default_baud(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_sampling_rate_hz")]
    pub sampling_rate_hz: f64,
    #[serde(default = "default_window_duration_s")]
    pub window_duration_s: f64,
    #[serde(default = "default_settling_time_s")]
    pub settling_time_s: f64,
    #[serde(default = "default_window_count")]
    pub window_count: usize,
    #[serde(default = "default_channel_order")]
    pub channel_order: Vec<Channel>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: default_sampling_rate_hz(),
            window_duration_s: default_window_duration_s(),
            settling_time_s: default_settling_time_s(),
            window_count: default_window_count(),
            channel_order: default_channel_order(),
        }
    }
}

impl AcquisitionConfig {
    /// Samples per window, truncated toward zero.
    pub fn samples_per_window(&self) -> usize {
        (self.sampling_rate_hz * self.window_duration_s) as usize
    }

    pub fn total_samples(&self) -> usize {
        self.samples_per_window().saturating_mul(self.window_count)
    }

    pub fn settling_time(&self) -> Duration {
        Duration::from_secs_f64(self.settling_time_s)
    }

    /// Interval between two sample requests issued by the MCU.
    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sampling_rate_hz)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    #[serde(default = "default_noise")]
    pub noise: f64,
    #[serde(default = "default_midpoint")]
    pub midpoint: f64,
    #[serde(default)]
    pub amplitude: ChannelAmplitudes,
    /// Fixed RNG seed; entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            noise: default_noise(),
            midpoint: default_midpoint(),
            amplitude: ChannelAmplitudes::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ChannelAmplitudes {
    #[serde(rename = "R", default = "default_red_amplitude")]
    pub red: f64,
    #[serde(rename = "IR", default = "default_infrared_amplitude")]
    pub infrared: f64,
}

impl Default for ChannelAmplitudes {
    fn default() -> Self {
        Self {
            red: default_red_amplitude(),
            infrared: default_infrared_amplitude(),
        }
    }
}

impl ChannelAmplitudes {
    pub fn for_channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Red => self.red,
            Channel::Infrared => self.infrared,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if self.serial.port.trim().is_empty() {
            return invalid("serial.port must not be empty".to_string());
        }
        if self.serial.baud == 0 {
            return invalid("serial.baud must be > 0".to_string());
        }
        if self.serial.read_timeout_ms == 0 {
            return invalid("serial.read_timeout_ms must be > 0".to_string());
        }

        let acq = &self.acquisition;
        if !acq.sampling_rate_hz.is_finite() || acq.sampling_rate_hz <= 0.0 {
            return invalid(format!("acquisition.sampling_rate_hz must be > 0, got {}", acq.sampling_rate_hz));
        }
        if !acq.window_duration_s.is_finite() || acq.window_duration_s < 0.0 {
            return invalid(format!("acquisition.window_duration_s must be >= 0, got {}", acq.window_duration_s));
        }
        if !acq.settling_time_s.is_finite() || acq.settling_time_s < 0.0 {
            return invalid(format!("acquisition.settling_time_s must be >= 0, got {}", acq.settling_time_s));
        }
        if Duration::try_from_secs_f64(acq.settling_time_s).is_err() {
            return invalid(format!("acquisition.settling_time_s is out of range, got {}", acq.settling_time_s));
        }
        if Duration::try_from_secs_f64(1.0 / acq.sampling_rate_hz).is_err() {
            return invalid(format!(
                "acquisition.sampling_rate_hz is too low for a request period, got {}",
                acq.sampling_rate_hz
            ));
        }
        if acq.window_count == 0 {
            return invalid("acquisition.window_count must be > 0".to_string());
        }
        if acq.channel_order.is_empty() {
            return invalid("acquisition.channel_order must list at least one channel".to_string());
        }
        if acq.samples_per_window() == 0 {
            return invalid(format!(
                "window of {} s at {} Hz holds no samples",
                acq.window_duration_s, acq.sampling_rate_hz
            ));
        }
        match acq.samples_per_window().checked_mul(acq.window_count) {
            Some(total) if total <= MAX_PLAN_SAMPLES => {}
            _ => {
                return invalid(format!(
                    "plan of {} windows x {} s at {} Hz exceeds {} samples",
                    acq.window_count, acq.window_duration_s, acq.sampling_rate_hz, MAX_PLAN_SAMPLES
                ));
            }
        }

        let sig = &self.signal;
        if !sig.frequency_hz.is_finite() {
            return invalid(format!("signal.frequency_hz must be finite, got {}", sig.frequency_hz));
        }
        if !sig.noise.is_finite() || sig.noise < 0.0 {
            return invalid(format!("signal.noise must be >= 0, got {}", sig.noise));
        }
        if !sig.midpoint.is_finite() {
            return invalid(format!("signal.midpoint must be finite, got {}", sig.midpoint));
        }
        if !sig.amplitude.red.is_finite() || !sig.amplitude.infrared.is_finite() {
            return invalid("signal.amplitude values must be finite".to_string());
        }
        Ok(())
    }
}

fn default_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud() -> u32 { 115200 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_sampling_rate_hz() -> f64 { 100.0 }
fn default_window_duration_s() -> f64 { 5.0 }
fn default_settling_time_s() -> f64 { 0.150 }
fn default_window_count() -> usize { 6 }
fn default_channel_order() -> Vec<Channel> {
    [Channel::Red, Channel::Infrared].repeat(3)
}
fn default_frequency_hz() -> f64 { 1.2 }
fn default_noise() -> f64 { 150.0 }
fn default_midpoint() -> f64 { 2048.0 }
fn default_red_amplitude() -> f64 { 900.0 }
fn default_infrared_amplitude() -> f64 { 1100.0 }

pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_bench_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.serial.baud, 115200);
        assert_eq!(config.serial.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.acquisition.samples_per_window(), 500);
        assert_eq!(config.acquisition.total_samples(), 3000);
        assert_eq!(config.acquisition.settling_time(), Duration::from_millis(150));
        assert_eq!(config.acquisition.channel_order.len(), 6);
        assert_eq!(config.acquisition.channel_order[1], Channel::Infrared);
        assert_eq!(config.signal.amplitude.for_channel(Channel::Red), 900.0);
        assert_eq!(config.signal.amplitude.for_channel(Channel::Infrared), 1100.0);
        assert!(config.signal.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml_str = r#"
[acquisition]
window_count = 2
channel_order = ["IR"]

[signal.amplitude]
R = 500.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.acquisition.window_count, 2);
        assert_eq!(config.acquisition.channel_order, vec![Channel::Infrared]);
        assert_eq!(config.acquisition.sampling_rate_hz, 100.0);
        assert_eq!(config.signal.amplitude.red, 500.0);
        assert_eq!(config.signal.amplitude.infrared, 1100.0);
    }

    #[test]
    fn samples_per_window_truncates() {
        let acq = AcquisitionConfig {
            sampling_rate_hz: 100.0,
            window_duration_s: 0.057,
            ..Default::default()
        };
        assert_eq!(acq.samples_per_window(), 5);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.acquisition.window_count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.acquisition.channel_order.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.signal.noise = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.acquisition.window_duration_s = 0.001;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.serial.baud = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_durations_and_plan_size() {
        let mut config = Config::default();
        config.acquisition.settling_time_s = 1e20;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.acquisition.window_duration_s = 1e300;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.acquisition.total_samples(), usize::MAX);

        let mut config = Config::default();
        config.acquisition.window_count = usize::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.acquisition.sampling_rate_hz = 1e-20;
        config.acquisition.window_duration_s = 1e21;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.acquisition.window_count = MAX_PLAN_SAMPLES / 500;
        config.acquisition.settling_time_s = 3600.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_channel_label_is_a_parse_error() {
        let err = toml::from_str::<Config>("[acquisition]\nchannel_order = [\"GREEN\"]\n");
        assert!(err.is_err());
    }
}
