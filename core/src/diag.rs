//! Tick-rate and link-health bookkeeping.

/// Ticks between reports.
pub const REPORT_INTERVAL: u32 = 1024;

/// One diagnostics window, ready to be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Mean tick period over the window, in microseconds.
    pub mean_period_us: u32,
    /// Total bad link frames seen since boot.
    pub bad_frames: u32,
}

/// Accumulates tick timestamps and produces a [`TickReport`] every
/// [`REPORT_INTERVAL`] ticks.
pub struct TickStats {
    window_ticks: u32,
    window_start: u32,
    bad_frames: u32,
}

impl TickStats {
    pub const fn new() -> Self {
        TickStats {
            window_ticks: 0,
            window_start: 0,
            bad_frames: 0,
        }
    }

    /// Record the running total of discarded link frames.
    pub fn set_bad_frames(&mut self, total: u32) {
        self.bad_frames = total;
    }

    pub fn bad_frames(&self) -> u32 {
        self.bad_frames
    }

    /// Note a tick at `now` (milliseconds, wrapping). Returns a report at
    /// the end of each window.
    pub fn on_tick(&mut self, now: u32) -> Option<TickReport> {
        if self.window_ticks == 0 {
            self.window_start = now;
        }
        self.window_ticks += 1;
        if self.window_ticks < REPORT_INTERVAL {
            return None;
        }
        let span_ms = now.wrapping_sub(self.window_start);
        self.window_ticks = 0;
        Some(TickReport {
            // The window covers REPORT_INTERVAL - 1 periods.
            mean_period_us: span_ms.saturating_mul(1000) / (REPORT_INTERVAL - 1),
            bad_frames: self.bad_frames,
        })
    }
}

impl Default for TickStats {
    fn default() -> Self {
        TickStats::new()
    }
}
