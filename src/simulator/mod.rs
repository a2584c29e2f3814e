//! Sensor-side protocol loop.

use std::time::Duration;

use crate::communication::{Transport, TransportError};
use crate::scheduler::TimeInterface;
use crate::session::{Outcome, TriggerStateMachine};

/// Emulated PPG front end answering an MCU over a [`Transport`].
///
/// Each poll performs one bounded read, feeds the byte (if any) to the state
/// machine, and writes the resulting sample frame. Nothing is written on a
/// read timeout.
pub struct SensorSimulator<T, C> {
    transport: T,
    clock: C,
    machine: TriggerStateMachine,
    read_timeout: Duration,
}

impl<T, C> SensorSimulator<T, C>
where
    T: Transport,
    C: TimeInterface,
{
    pub fn new(transport: T, clock: C, machine: TriggerStateMachine, read_timeout: Duration) -> Self {
        Self {
            transport,
            clock,
            machine,
            read_timeout,
        }
    }

    pub fn machine(&self) -> &TriggerStateMachine {
        &self.machine
    }

    /// Serve the MCU until the transport fails.
    pub async fn run(&mut self) -> Result<(), TransportError> {
        tracing::info!(
            "Waiting for MCU trigger: {} windows x {} samples",
            self.machine.plan().window_count(),
            self.machine.plan().samples_per_window()
        );
        loop {
            if let Err(e) = self.poll_once().await {
                let stats = self.machine.stats();
                tracing::error!(
                    samples_sent = stats.samples_sent,
                    sessions_completed = stats.sessions_completed,
                    "Protocol loop stopped: {}",
                    e
                );
                return Err(e);
            }
        }
    }

    /// One read/dispatch/write step. `Ok(None)` means the read timed out.
    pub async fn poll_once(&mut self) -> Result<Option<Outcome>, TransportError> {
        let Some(byte) = self.transport.read_byte(self.read_timeout).await? else {
            return Ok(None);
        };
        let now = self.clock.now_monotonic();
        let outcome = self.machine.handle_byte(byte, now);
        match &outcome {
            Outcome::Sample { frame, .. } => self.transport.write_bytes(frame).await?,
            Outcome::Completed { .. } => {
                let stats = self.machine.stats();
                tracing::info!(
                    samples_sent = stats.samples_sent,
                    settling_drops = stats.settling_drops,
                    ignored_bytes = stats.ignored_bytes,
                    "Session statistics"
                );
            }
            _ => {}
        }
        Ok(Some(outcome))
    }
}

impl<T, C> std::fmt::Debug for SensorSimulator<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSimulator")
            .field("state", &self.machine.state())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
