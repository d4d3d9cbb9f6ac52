//! Wall-clock timing for rounds, discoveries and cases

use std::time::Instant;

/// Measures one named unit of work
#[derive(Debug)]
pub struct Timer {
    label: String,
    started: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Milliseconds since start, saturating at `u64::MAX`
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Consume the timer, trace the measurement and return it in milliseconds
    pub fn finish(self) -> u64 {
        let ms = self.elapsed_ms();
        tracing::trace!("{} took {}ms", self.label, ms);
        ms
    }
}
