//! Host-side PPG front-end emulator.
//!
//! Waits for an MCU start trigger on a serial link, then answers each sample
//! request with the next value of a precomputed plan of alternating
//! `R`/`IR` windows, keeping a quiet settling gap between windows.

pub mod communication;
pub mod config;
pub mod export;
pub mod probe;
pub mod protocol;
pub mod scheduler;
pub mod session;
pub mod signal;
pub mod simulator;
pub mod window_plan;

pub use communication::{SerialTransport, StreamTransport, Transport, TransportError};
pub use config::{Config, ConfigError};
pub use session::{Outcome, ProtocolState, SessionState, SessionStats, TriggerStateMachine};
pub use simulator::SensorSimulator;
pub use window_plan::{Channel, Window, WindowPlan};
