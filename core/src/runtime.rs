//! The per-tick pipeline.
//!
//! Order within a tick is fixed and is what makes the whole engine
//! deterministic:
//!
//! 1. ingest both halves' booleans and collect this tick's rising edges
//!    ("flips"),
//! 2. pick the active layer from held layer-hold positions,
//! 3. permissive-hold injections: every position whose base-layer action is
//!    a mod-tap or tap-dance gets an extra FSM step with the permissive
//!    flag raised whenever some *other* position flipped this tick,
//! 4. bind and step every position, left half then right, row-major.
//!
//! Binding is sticky: a position keeps its current action for as long as
//! its machine is away from `Start`, so releasing a layer-hold mid-press
//! never tears a chord apart.

use heapless::Vec;

use crate::action::Action;
use crate::diag::TickStats;
use crate::fsm::Fsm;
use crate::hid::HidSinks;
use crate::keymap::Keymap;
use crate::{positions, HalfScan, Pos, COLS, ROWS};

const KEY_COUNT: usize = 2 * ROWS * COLS;

struct Bound {
    action: &'static Action,
    fsm: Fsm,
}

#[derive(Default)]
struct KeyCell {
    down: bool,
    prev: bool,
    bound: Option<Bound>,
}

/// The engine. Feed it one pair of debounced matrices and a millisecond
/// timestamp per tick; it drives the HID sinks.
pub struct Runtime {
    keymap: Keymap,
    keys: [[[KeyCell; COLS]; ROWS]; 2],
    flips: Vec<Pos, KEY_COUNT>,
    stats: TickStats,
}

impl Runtime {
    pub fn new(keymap: Keymap) -> Self {
        Runtime {
            keymap,
            keys: Default::default(),
            flips: Vec::new(),
            stats: TickStats::new(),
        }
    }

    fn cell(&self, p: Pos) -> &KeyCell {
        &self.keys[p.side as usize][p.row as usize][p.col as usize]
    }

    fn cell_mut(&mut self, p: Pos) -> &mut KeyCell {
        &mut self.keys[p.side as usize][p.row as usize][p.col as usize]
    }

    /// Running total of discarded link frames, for the diagnostics line.
    pub fn record_bad_frames(&mut self, total: u32) {
        self.stats.set_bad_frames(total);
    }

    /// Drop every binding, return every machine to start and release all
    /// sinks. This is the re-initialization path after a fault; the host
    /// rediscovers the truth on the next rising edge.
    pub fn reset<S: HidSinks>(&mut self, sinks: &mut S) {
        sinks.release_all();
        for p in positions() {
            let cell = self.cell_mut(p);
            cell.down = false;
            cell.prev = false;
            cell.bound = None;
        }
        self.flips.clear();
    }

    /// One tick. `scan` is indexed by [`crate::Side`]; `now` is a wrapping
    /// millisecond timestamp read once for the whole tick.
    pub fn tick<S: HidSinks>(&mut self, scan: &[HalfScan; 2], now: u32, sinks: &mut S) {
        // 1. Ingest and collect flips.
        self.flips.clear();
        for p in positions() {
            let down = scan[p.side as usize][p.row as usize][p.col as usize];
            let cell = self.cell_mut(p);
            cell.prev = cell.down;
            cell.down = down;
            if down && !cell.prev {
                // Capacity is the full matrix; this cannot overflow.
                let _ = self.flips.push(p);
            }
        }

        // 2. Active layer: the last held layer-hold in traversal order
        // wins; none held means base.
        let mut active = 0;
        for p in positions() {
            if let Action::LayerHold(layer) = self.keymap.base(p) {
                if self.cell(p).down {
                    active = *layer;
                }
            }
        }

        // 3. Permissive-hold injections, decided against the *base-layer*
        // action of each position. The extra step only does anything when
        // the machine is sitting in a permissive-eligible wait.
        for p in positions() {
            match self.keymap.base(p) {
                Action::ModTap(_) | Action::TapDance(_) => {}
                _ => continue,
            }
            if !self.flips.iter().any(|f| *f != p) {
                continue;
            }
            let down = self.cell(p).down;
            if let Some(bound) = &mut self.cell_mut(p).bound {
                bound.fsm.step(down, now, true, sinks);
            }
        }

        // 4. Bind and step.
        for p in positions() {
            // Layer-hold positions only ever select layers.
            if let Action::LayerHold(_) = self.keymap.base(p) {
                continue;
            }
            let resolved = self.keymap.action(active, p);
            let down = self.cell(p).down;
            let cell = self.cell_mut(p);
            let keep = match &cell.bound {
                // Rebinding is only legal in `Start`; while the machine is
                // mid-flight the old action stays latched.
                Some(b) => !b.fsm.is_idle() || core::ptr::eq(b.action, resolved),
                None => false,
            };
            if !keep {
                cell.bound = Fsm::for_action(resolved).map(|fsm| Bound {
                    action: resolved,
                    fsm,
                });
            }
            if let Some(bound) = &mut cell.bound {
                bound.fsm.step(down, now, false, sinks);
            }
        }

        // 5. Diagnostics.
        if let Some(report) = self.stats.on_tick(now) {
            log::info!(
                "mean tick period {} us, {} bad link frames",
                report.mean_period_us,
                report.bad_frames
            );
        }
    }
}
