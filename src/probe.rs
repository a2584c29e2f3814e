//! MCU stand-in for bench checks.
//!
//! Plays the firmware's side of the exchange against a running simulator:
//! a start trigger, then one sample request per sampling tick, each answered
//! (or not, during settling gaps) by a two-byte frame.

use serde::Serialize;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::communication::{Transport, TransportError};
use crate::config::Config;
use crate::protocol::{FRAME_LEN, SAMPLE_REQUEST, START_TRIGGER, decode_sample};
use crate::signal::SAMPLE_MAX;
use crate::window_plan::Channel;

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub samples_per_window: usize,
    pub channel_order: Vec<Channel>,
    pub window_count: usize,
    pub request_period: Duration,
    /// How long to wait for a frame after each request.
    pub response_timeout: Duration,
    /// Give up after this many requests.
    pub max_requests: usize,
    /// Send one extra request once done so the simulator returns to idle.
    pub close_session: bool,
}

impl ProbeConfig {
    pub fn from_config(config: &Config) -> Self {
        let acq = &config.acquisition;
        let period = acq.sample_period();
        let total = acq.total_samples();
        // Room for every sample plus the requests swallowed by settling gaps.
        let settling_ticks = (acq.settling_time().as_secs_f64() / period.as_secs_f64()).ceil() as usize + 1;
        Self {
            samples_per_window: acq.samples_per_window(),
            channel_order: acq.channel_order.clone(),
            window_count: acq.window_count,
            request_period: period,
            response_timeout: period / 2,
            max_requests: total + acq.window_count * settling_ticks + 16,
            close_session: true,
        }
    }

    pub fn expected_samples(&self) -> usize {
        self.samples_per_window * self.window_count
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WindowSummary {
    pub window: usize,
    pub channel: Channel,
    pub count: usize,
    pub mean: f64,
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub samples: Vec<u16>,
    pub requests_sent: usize,
    pub unanswered_requests: usize,
    pub complete: bool,
    pub elapsed_s: f64,
    pub windows: Vec<WindowSummary>,
}

pub struct McuProbe<T> {
    transport: T,
    config: ProbeConfig,
}

impl<T: Transport> McuProbe<T> {
    pub fn new(transport: T, config: ProbeConfig) -> Self {
        Self { transport, config }
    }

    pub async fn run(&mut self) -> Result<ProbeReport, TransportError> {
        let expected = self.config.expected_samples();
        let started = Instant::now();
        let mut samples = Vec::with_capacity(expected);
        let mut requests_sent = 0;
        let mut unanswered = 0;
        let mut resync = false;

        self.transport.write_bytes(&[START_TRIGGER]).await?;
        tracing::info!("Start trigger sent, expecting {} samples", expected);

        let mut ticker = tokio::time::interval(self.config.request_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while samples.len() < expected && requests_sent < self.config.max_requests {
            ticker.tick().await;
            if resync {
                self.drain_input().await?;
                resync = false;
            }
            self.transport.write_bytes(&[SAMPLE_REQUEST]).await?;
            requests_sent += 1;
            match self.read_frame().await? {
                Some(frame) => samples.push(decode_sample(frame) & SAMPLE_MAX),
                None => {
                    unanswered += 1;
                    resync = true;
                    tracing::debug!(after = samples.len(), "Request went unanswered");
                }
            }
        }

        let complete = samples.len() == expected;
        if complete && self.config.close_session {
            ticker.tick().await;
            self.transport.write_bytes(&[SAMPLE_REQUEST]).await?;
            requests_sent += 1;
        } else if !complete {
            tracing::warn!(
                "Probe gave up after {} requests with {}/{} samples",
                requests_sent,
                samples.len(),
                expected
            );
        }

        let elapsed_s = started.elapsed().as_secs_f64();
        tracing::info!(
            "Received {} samples in {:.2} s ({} unanswered requests)",
            samples.len(),
            elapsed_s,
            unanswered
        );

        let windows = summarize_windows(&samples, &self.config);
        Ok(ProbeReport {
            samples,
            requests_sent,
            unanswered_requests: unanswered,
            complete,
            elapsed_s,
            windows,
        })
    }

    /// Collect one frame; a partial frame at timeout is discarded.
    async fn read_frame(&mut self) -> Result<Option<[u8; FRAME_LEN]>, TransportError> {
        let deadline = Instant::now() + self.config.response_timeout;
        let mut frame = [0u8; FRAME_LEN];
        for slot in frame.iter_mut() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.transport.read_byte(remaining).await? {
                Some(b) => *slot = b,
                None => return Ok(None),
            }
        }
        Ok(Some(frame))
    }

    /// Discard bytes already waiting on the link so the next frame starts aligned.
    async fn drain_input(&mut self) -> Result<usize, TransportError> {
        let mut discarded = 0;
        while self.transport.read_byte(Duration::ZERO).await?.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "Dropped late bytes before next request");
        }
        Ok(discarded)
    }
}

/// Split received samples into windows and describe each.
pub fn summarize_windows(samples: &[u16], config: &ProbeConfig) -> Vec<WindowSummary> {
    if config.samples_per_window == 0 || config.channel_order.is_empty() {
        return Vec::new();
    }
    samples
        .chunks(config.samples_per_window)
        .zip(config.channel_order.iter().copied().cycle())
        .enumerate()
        .map(|(window, (chunk, channel))| {
            let sum: u64 = chunk.iter().map(|&v| v as u64).sum();
            WindowSummary {
                window,
                channel,
                count: chunk.len(),
                mean: sum as f64 / chunk.len() as f64,
                min: chunk.iter().copied().min().unwrap_or(0),
                max: chunk.iter().copied().max().unwrap_or(0),
            }
        })
        .collect()
}
