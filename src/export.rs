//! CSV dump of a window plan for offline comparison with MCU captures.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::window_plan::{Channel, WindowPlan};

#[derive(Debug, Serialize)]
struct PlanRecord {
    window: usize,
    channel: Channel,
    index: usize,
    value: u16,
}

pub fn write_plan_csv<W: Write>(plan: &WindowPlan, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (window, w) in plan.windows().iter().enumerate() {
        for (index, &value) in w.samples.iter().enumerate() {
            wtr.serialize(PlanRecord {
                window,
                channel: w.channel,
                index,
                value,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_plan(plan: &WindowPlan, path: &Path) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_plan_csv(plan, file)?;
    tracing::info!("Wrote {} samples to {}", plan.total_samples(), path.display());
    Ok(())
}
