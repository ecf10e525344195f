//! Periodic progress reporting with a rate measured since the last report.

use std::time::Instant;

use tracing::info;

/// Emits an `info!` event every `every` units of work.
#[derive(Debug)]
pub struct Progress {
    label: &'static str,
    every: u64,
    last_count: u64,
    last_report: Instant,
}

impl Progress {
    /// `every == 0` disables reporting.
    pub fn new(label: &'static str, every: u64) -> Self {
        Self {
            label,
            every,
            last_count: 0,
            last_report: Instant::now(),
        }
    }

    /// Record the running total. Returns the rate (units per second since
    /// the previous report) when a report was emitted.
    pub fn tick(&mut self, count: u64) -> Option<f64> {
        if self.every == 0 || count == 0 || count % self.every != 0 || count == self.last_count {
            return None;
        }
        let elapsed = self.last_report.elapsed().as_secs_f64();
        let done = count - self.last_count;
        let rate = if elapsed > 0.0 { done as f64 / elapsed } else { done as f64 };
        info!("{}: {} ({:.0}/s)", self.label, count, rate);
        self.last_count = count;
        self.last_report = Instant::now();
        Some(rate)
    }
}

/// Average rate over a whole run, rounded down.
pub fn per_second(count: u64, seconds: f64) -> i64 {
    if seconds > 0.0 {
        (count as f64 / seconds) as i64
    } else {
        count as i64
    }
}
