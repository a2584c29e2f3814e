//! Trigger-driven sample exchange.
//!
//! [`TriggerStateMachine`] consumes one command byte at a time together with
//! the instant it arrived and decides what, if anything, goes back on the
//! wire. It performs no I/O, so the timing rules can be driven directly from
//! tests with synthetic instants.

use std::time::{Duration, Instant};

use crate::protocol::{Command, FRAME_LEN, encode_sample};
use crate::window_plan::{Channel, WindowPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    Active { window: usize, sample: usize },
}

/// Progress of the session in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub armed: bool,
    pub window_index: usize,
    pub sample_index: usize,
    pub started_at: Option<Instant>,
    pub last_window_end: Option<Instant>,
}

impl SessionState {
    fn arm(&mut self, now: Instant) {
        *self = SessionState {
            armed: true,
            window_index: 0,
            sample_index: 0,
            started_at: Some(now),
            last_window_end: None,
        };
    }

    fn reset(&mut self) {
        *self = SessionState::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub samples_sent: u64,
    pub bytes_written: u64,
    pub settling_drops: u64,
    pub ignored_bytes: u64,
}

/// What a single inbound byte resulted in.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A start trigger armed a new session.
    Armed,
    /// A sample frame must be written to the MCU.
    Sample {
        window: usize,
        index: usize,
        channel: Channel,
        value: u16,
        frame: [u8; FRAME_LEN],
        /// This sample closed its window.
        window_complete: bool,
    },
    /// Request dropped: the inter-window quiet period is still running.
    Settling { remaining: Duration },
    /// All windows were delivered; the session is back to idle.
    Completed { elapsed: Duration },
    /// The request hit an empty window, which was skipped.
    WindowSkipped { window: usize },
    /// Byte had no meaning in the current state.
    Ignored(Command),
}

#[derive(Debug)]
pub struct TriggerStateMachine {
    plan: WindowPlan,
    settling_time: Duration,
    session: SessionState,
    stats: SessionStats,
}

impl TriggerStateMachine {
    pub fn new(plan: WindowPlan, settling_time: Duration) -> Self {
        Self {
            plan,
            settling_time,
            session: SessionState::default(),
            stats: SessionStats::default(),
        }
    }

    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn settling_time(&self) -> Duration {
        self.settling_time
    }

    pub fn state(&self) -> ProtocolState {
        if self.session.armed {
            ProtocolState::Active {
                window: self.session.window_index,
                sample: self.session.sample_index,
            }
        } else {
            ProtocolState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.session.armed
    }

    pub fn handle_byte(&mut self, byte: u8, now: Instant) -> Outcome {
        self.handle(Command::from(byte), now)
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Outcome {
        match (command, self.session.armed) {
            (Command::Start, false) => {
                self.session.arm(now);
                self.stats.sessions_started += 1;
                tracing::info!("MCU start received, simulation armed");
                Outcome::Armed
            }
            (Command::RequestSample, true) => self.serve_request(now),
            (other, _) => {
                self.stats.ignored_bytes += 1;
                tracing::trace!(command = ?other, armed = self.session.armed, "Ignoring byte");
                Outcome::Ignored(other)
            }
        }
    }

    fn serve_request(&mut self, now: Instant) -> Outcome {
        let window_index = self.session.window_index;
        let Some(window) = self.plan.window(window_index) else {
            let elapsed = self
                .session
                .started_at
                .map(|start| now.saturating_duration_since(start))
                .unwrap_or_default();
            self.session.reset();
            self.stats.sessions_completed += 1;
            tracing::info!("Simulation completed in {:.2} s", elapsed.as_secs_f64());
            return Outcome::Completed { elapsed };
        };

        if self.session.sample_index == 0 {
            if let Some(end) = self.session.last_window_end {
                let quiet = now.saturating_duration_since(end);
                if quiet < self.settling_time {
                    self.stats.settling_drops += 1;
                    let remaining = self.settling_time - quiet;
                    tracing::debug!(window = window_index, ?remaining, "Request dropped during settling");
                    return Outcome::Settling { remaining };
                }
            }
        }

        let channel = window.channel;
        let window_len = window.len();
        let index = self.session.sample_index;
        let Some(&value) = window.samples.get(index) else {
            self.finish_window(now);
            tracing::debug!(window = window_index, "Skipping empty window");
            return Outcome::WindowSkipped { window: window_index };
        };

        let frame = encode_sample(value);
        self.stats.samples_sent += 1;
        self.stats.bytes_written += FRAME_LEN as u64;
        self.session.sample_index += 1;

        let window_complete = self.session.sample_index >= window_len;
        if window_complete {
            self.finish_window(now);
            tracing::debug!(window = window_index, %channel, "Window delivered");
        }
        tracing::trace!(window = window_index, index, value, "Sample sent");

        Outcome::Sample {
            window: window_index,
            index,
            channel,
            value,
            frame,
            window_complete,
        }
    }

    fn finish_window(&mut self, now: Instant) {
        self.session.sample_index = 0;
        self.session.window_index += 1;
        self.session.last_window_end = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelAmplitudes;
    use crate::protocol::{SAMPLE_REQUEST, START_TRIGGER};
    use crate::signal::SignalParams;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const SETTLE: Duration = Duration::from_millis(150);

    fn machine(windows: usize, samples: usize) -> TriggerStateMachine {
        let plan = WindowPlan::build(
            &SignalParams::default(),
            &[Channel::Red, Channel::Infrared],
            &ChannelAmplitudes::default(),
            windows,
            samples,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        TriggerStateMachine::new(plan, SETTLE)
    }

    #[test]
    fn start_arms_and_resets_indices() {
        let mut m = machine(2, 3);
        let t0 = Instant::now();
        assert_eq!(m.handle_byte(START_TRIGGER, t0), Outcome::Armed);
        assert_eq!(m.state(), ProtocolState::Active { window: 0, sample: 0 });
        assert_eq!(m.session().started_at, Some(t0));
        assert_eq!(m.session().last_window_end, None);
    }

    #[test]
    fn requests_while_idle_do_nothing() {
        let mut m = machine(2, 3);
        let t0 = Instant::now();
        for _ in 0..10 {
            assert_eq!(m.handle_byte(SAMPLE_REQUEST, t0), Outcome::Ignored(Command::RequestSample));
        }
        assert_eq!(m.state(), ProtocolState::Idle);
        assert_eq!(m.session(), &SessionState::default());
        assert_eq!(m.stats().samples_sent, 0);
        assert_eq!(m.stats().ignored_bytes, 10);
    }

    #[test]
    fn unknown_bytes_are_ignored_in_any_state() {
        let mut m = machine(1, 2);
        let t0 = Instant::now();
        assert!(matches!(m.handle_byte(0x00, t0), Outcome::Ignored(Command::Unknown(0))));
        m.handle_byte(START_TRIGGER, t0);
        assert!(matches!(m.handle_byte(b'X', t0), Outcome::Ignored(_)));
        assert_eq!(m.state(), ProtocolState::Active { window: 0, sample: 0 });
    }

    #[test]
    fn second_start_while_active_is_a_no_op() {
        let mut m = machine(2, 3);
        let t0 = Instant::now();
        m.handle_byte(START_TRIGGER, t0);
        m.handle_byte(SAMPLE_REQUEST, t0);
        let later = t0 + Duration::from_secs(1);
        assert_eq!(m.handle_byte(START_TRIGGER, later), Outcome::Ignored(Command::Start));
        assert_eq!(m.state(), ProtocolState::Active { window: 0, sample: 1 });
        assert_eq!(m.session().started_at, Some(t0));
        assert_eq!(m.stats().sessions_started, 1);
    }

    #[test]
    fn samples_follow_the_plan_and_close_windows() {
        let mut m = machine(2, 3);
        let expected = m.plan().windows()[0].samples.clone();
        let t0 = Instant::now();
        m.handle_byte(START_TRIGGER, t0);
        for (i, want) in expected.iter().enumerate() {
            match m.handle_byte(SAMPLE_REQUEST, t0) {
                Outcome::Sample { window, index, value, frame, window_complete, channel } => {
                    assert_eq!((window, index), (0, i));
                    assert_eq!(value, *want);
                    assert_eq!(frame, encode_sample(*want));
                    assert_eq!(channel, Channel::Red);
                    assert_eq!(window_complete, i == 2);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(m.state(), ProtocolState::Active { window: 1, sample: 0 });
        assert_eq!(m.session().last_window_end, Some(t0));
    }

    #[test]
    fn settling_time_gates_the_next_window() {
        let mut m = machine(2, 2);
        let t0 = Instant::now();
        m.handle_byte(START_TRIGGER, t0);
        m.handle_byte(SAMPLE_REQUEST, t0);
        m.handle_byte(SAMPLE_REQUEST, t0);

        let early = t0 + Duration::from_millis(149);
        match m.handle_byte(SAMPLE_REQUEST, early) {
            Outcome::Settling { remaining } => assert_eq!(remaining, Duration::from_millis(1)),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(m.state(), ProtocolState::Active { window: 1, sample: 0 });
        assert_eq!(m.stats().settling_drops, 1);

        let exact = t0 + SETTLE;
        assert!(matches!(
            m.handle_byte(SAMPLE_REQUEST, exact),
            Outcome::Sample { window: 1, index: 0, .. }
        ));
        // Only the first sample of a window is gated.
        assert!(matches!(
            m.handle_byte(SAMPLE_REQUEST, exact),
            Outcome::Sample { window: 1, index: 1, .. }
        ));
    }

    #[test]
    fn request_after_last_window_completes_silently() {
        let mut m = machine(2, 2);
        let mut now = Instant::now();
        m.handle_byte(START_TRIGGER, now);
        for _ in 0..2 {
            for _ in 0..2 {
                assert!(matches!(m.handle_byte(SAMPLE_REQUEST, now), Outcome::Sample { .. }));
            }
            now += SETTLE;
        }
        assert_eq!(m.state(), ProtocolState::Active { window: 2, sample: 0 });

        match m.handle_byte(SAMPLE_REQUEST, now) {
            Outcome::Completed { elapsed } => assert_eq!(elapsed, SETTLE * 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(m.is_idle());
        assert_eq!(m.stats().sessions_completed, 1);
        assert_eq!(m.stats().samples_sent, 4);
        assert_eq!(m.stats().bytes_written, 8);

        assert!(matches!(m.handle_byte(SAMPLE_REQUEST, now), Outcome::Ignored(_)));
        assert_eq!(m.handle_byte(START_TRIGGER, now), Outcome::Armed);
        assert_eq!(m.state(), ProtocolState::Active { window: 0, sample: 0 });
    }

    #[test]
    fn empty_windows_are_skipped_without_output() {
        let mut m = machine(2, 0);
        let t0 = Instant::now();
        m.handle_byte(START_TRIGGER, t0);
        assert_eq!(m.handle_byte(SAMPLE_REQUEST, t0), Outcome::WindowSkipped { window: 0 });
        let t1 = t0 + SETTLE;
        assert_eq!(m.handle_byte(SAMPLE_REQUEST, t1), Outcome::WindowSkipped { window: 1 });
        assert!(matches!(m.handle_byte(SAMPLE_REQUEST, t1 + SETTLE), Outcome::Completed { .. }));
        assert_eq!(m.stats().samples_sent, 0);
    }
}
