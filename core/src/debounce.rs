//! Eager switch debouncing.
//!
//! The usual debouncer waits for the signal to sit still before reporting,
//! which buys its noise immunity with 5–10 ms of latency on every press.
//! This one reports the very first edge immediately and *then* refuses to
//! report again until the signal has been stable for the hold-off window:
//!
//! ```text
//!                        __      ___________________________
//! Signal  ______________/  \/\/\/
//!                        ___________________________________
//! Report  ______________/
//! ```
//!
//! The cost is that a stabilized state can disagree with what was reported
//! at the start of the window; when that happens the report flips as the
//! window closes, which reads as a (slightly late) second edge. For key
//! switches that is the rare case of a contact bouncing the whole time it
//! was touched.

/// Per-key debounce state. Timestamps are wrapping milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounce {
    /// The signal has been quiet; the reported state is the signal.
    Stable(bool),
    /// An edge was reported and the hold-off window is open.
    Settling {
        /// What is currently being reported.
        reported: bool,
        /// The most recent raw reading.
        current: bool,
        /// When `current` was last observed changing.
        since: u32,
    },
}

impl Default for Debounce {
    fn default() -> Self {
        Debounce::Stable(false)
    }
}

impl Debounce {
    /// A fresh all-keys-up grid.
    pub fn grid<const R: usize, const C: usize>() -> [[Debounce; C]; R] {
        [[Debounce::Stable(false); C]; R]
    }

    /// The debounced state.
    pub fn is_down(&self) -> bool {
        match self {
            Debounce::Stable(down) => *down,
            Debounce::Settling { reported, .. } => *reported,
        }
    }

    /// Feed one raw reading. Returns the debounced state, same as
    /// [`is_down`](Debounce::is_down).
    pub fn step(&mut self, raw: bool, now: u32, stable_ms: u32) -> bool {
        *self = match *self {
            Debounce::Stable(prior) => {
                if raw != prior {
                    // Report the edge right away; open the hold-off window.
                    Debounce::Settling {
                        reported: raw,
                        current: raw,
                        since: now,
                    }
                } else {
                    *self
                }
            }
            Debounce::Settling {
                reported,
                current,
                since,
            } => {
                if raw != current {
                    Debounce::Settling {
                        reported,
                        current: raw,
                        since: now,
                    }
                } else if now.wrapping_sub(since) >= stable_ms {
                    Debounce::Stable(current)
                } else {
                    *self
                }
            }
        };
        self.is_down()
    }
}
