//! Per-key state machines.
//!
//! Every bound action owns one [`Fsm`]: a fixed array of state records
//! indexed by a small integer id, with transitions stored as ids so the
//! graphs can contain cycles without any ownership knots. The runtime calls
//! [`Fsm::step`] once per tick (plus the occasional permissive-hold
//! injection); when a step names a different state, the new state's entry
//! behavior runs immediately, and entry itself may name a further state;
//! the driver chases transitions to a fixed point within the tick. A state
//! that names itself terminates the chase.
//!
//! Timing uses the same wrapping millisecond compares as the debounce
//! trigger; a `Wait` is the only timed construct and is robust to tick
//! jitter because it compares timestamps rather than counting ticks.

use heapless::Vec;

use crate::action::{Action, ModTap, MouseMove, TapDance};
use crate::hid::HidSinks;
use crate::key_code::{ConsumerCode, KeyCode, MouseButtons};

/// Index of a state record within one machine.
pub type StateId = u8;

/// Upper bound on states per key. The widest graph is a full-length key
/// sequence: 1 start + 7 taps + 6 delays + 1 drain = 15 records.
pub const MAX_STATES: usize = 16;

/// What a press-like or tap-like state drives when it fires.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Output {
    Keys(&'static [KeyCode]),
    Consumer(ConsumerCode),
    Mouse(MouseButtons),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    /// Idle. Leaves on a rising edge.
    Start { next: StateId },
    /// Output held down for as long as the key is.
    Press {
        out: Output,
        next: StateId,
        held: bool,
    },
    /// Output pressed and released within one tick.
    Tap { out: Output, next: StateId },
    /// Timed branch: `success` once the (possibly inverted) input has
    /// outlived `timeout_ms`, `fail` if it drops earlier. A permissive-hold
    /// injection short-circuits to `success` when `permissive_ok`.
    Wait {
        timeout_ms: u32,
        success: StateId,
        fail: StateId,
        inverted: bool,
        permissive_ok: bool,
        since: u32,
    },
    /// Accelerating cursor movement, one report per held tick.
    Glide {
        profile: MouseMove,
        next: StateId,
        vx: f32,
        vy: f32,
    },
    /// Input-insensitive pause between sequence taps.
    Delay {
        delay_ms: u32,
        next: StateId,
        since: u32,
    },
    /// Absorbs the rest of a physical hold so a finished sequence does not
    /// retrigger from `Start`.
    Drain { next: StateId },
}

/// One key's state machine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Fsm {
    nodes: Vec<Node, MAX_STATES>,
    cur: StateId,
}

fn emit_press<S: HidSinks>(out: Output, sinks: &mut S) {
    let res = match out {
        Output::Keys(chord) => sinks.key_press(chord),
        Output::Consumer(code) => sinks.consumer_press(code),
        Output::Mouse(buttons) => sinks.mouse_press(buttons),
    };
    if let Err(e) = res {
        log::warn!("hid press dropped: {:?}", e);
    }
}

fn emit_release<S: HidSinks>(out: Output, sinks: &mut S) {
    let res = match out {
        Output::Keys(chord) => sinks.key_release(chord),
        // No partial release on the consumer endpoint.
        Output::Consumer(_) => sinks.consumer_release(),
        Output::Mouse(buttons) => sinks.mouse_release(buttons),
    };
    if let Err(e) = res {
        log::warn!("hid release dropped: {:?}", e);
    }
}

fn emit_tap<S: HidSinks>(out: Output, sinks: &mut S) {
    emit_press(out, sinks);
    emit_release(out, sinks);
}

fn emit_move<S: HidSinks>(vx: f32, vy: f32, dw: i16, sinks: &mut S) {
    if let Err(e) = sinks.mouse_move(round_i8(vx), round_i8(vy), clamp_i8(dw)) {
        log::warn!("hid move dropped: {:?}", e);
    }
}

/// Round to nearest, clamped to the report's i8 range. `f32::round` lives
/// in std, so this stays with integer casts.
fn round_i8(v: f32) -> i8 {
    let r = if v >= 0.0 {
        (v + 0.5) as i32
    } else {
        (v - 0.5) as i32
    };
    clamp_i8(r as i16)
}

fn clamp_i8(v: i16) -> i8 {
    if v > i8::MAX as i16 {
        i8::MAX
    } else if v < i8::MIN as i16 {
        i8::MIN
    } else {
        v as i8
    }
}

impl Fsm {
    /// Compile an action into its state graph. Actions that produce no key
    /// output (`NoOp`, `Trans`, `LayerHold`) have no machine.
    ///
    /// Takes the action by `'static` reference so single-key taps can
    /// borrow one-element chords straight out of the keymap tables.
    pub fn for_action(action: &'static Action) -> Option<Fsm> {
        use Node::*;
        let nodes: Vec<Node, MAX_STATES> = match action {
            Action::NoOp | Action::Trans | Action::LayerHold(_) => return None,
            Action::Key(chord) => graph(&[
                Start { next: 1 },
                Press {
                    out: Output::Keys(*chord),
                    next: 0,
                    held: false,
                },
            ])?,
            Action::Consumer(code) => graph(&[
                Start { next: 1 },
                Press {
                    out: Output::Consumer(*code),
                    next: 0,
                    held: false,
                },
            ])?,
            Action::MouseKey(buttons) => graph(&[
                Start { next: 1 },
                Press {
                    out: Output::Mouse(*buttons),
                    next: 0,
                    held: false,
                },
            ])?,
            Action::MouseMove(spec) => graph(&[
                Start { next: 1 },
                Glide {
                    profile: *spec,
                    next: 0,
                    vx: 0.0,
                    vy: 0.0,
                },
            ])?,
            Action::ModTap(ModTap {
                tap,
                hold,
                timeout_ms,
                hold_is_tap,
                permissive,
            }) => {
                let commit = if *hold_is_tap {
                    Tap {
                        out: Output::Keys(*hold),
                        next: 0,
                    }
                } else {
                    Press {
                        out: Output::Keys(*hold),
                        next: 0,
                        held: false,
                    }
                };
                graph(&[
                    Start { next: 1 },
                    Wait {
                        timeout_ms: *timeout_ms,
                        success: 2,
                        fail: 3,
                        inverted: false,
                        permissive_ok: *permissive,
                        since: 0,
                    },
                    commit,
                    Tap {
                        out: Output::Keys(core::slice::from_ref(tap)),
                        next: 0,
                    },
                ])?
            }
            Action::TapDance(TapDance {
                tap1,
                hold1,
                tap2,
                hold2,
                timeout_ms,
            }) => graph(&[
                Start { next: 1 },
                // First hold window.
                Wait {
                    timeout_ms: *timeout_ms,
                    success: 2,
                    fail: 3,
                    inverted: false,
                    permissive_ok: true,
                    since: 0,
                },
                Press {
                    out: Output::Keys(*hold1),
                    next: 0,
                    held: false,
                },
                // Inter-tap gap: watches for "still up", hence inverted.
                // Concurrent activity says nothing about a second tap, so
                // no permissive short-circuit here.
                Wait {
                    timeout_ms: *timeout_ms,
                    success: 4,
                    fail: 5,
                    inverted: true,
                    permissive_ok: false,
                    since: 0,
                },
                Tap {
                    out: Output::Keys(core::slice::from_ref(tap1)),
                    next: 0,
                },
                // Second hold window.
                Wait {
                    timeout_ms: *timeout_ms,
                    success: 6,
                    fail: 7,
                    inverted: false,
                    permissive_ok: true,
                    since: 0,
                },
                Press {
                    out: Output::Keys(*hold2),
                    next: 0,
                    held: false,
                },
                Tap {
                    out: Output::Keys(core::slice::from_ref(tap2)),
                    next: 0,
                },
            ])?,
            Action::Sequence(seq) => {
                let mut nodes: Vec<Node, MAX_STATES> = Vec::new();
                let n = seq.codes.len();
                let drain = (2 * n) as StateId;
                nodes.push(Start { next: 1 }).ok()?;
                for i in 0..n {
                    let last = i + 1 == n;
                    nodes
                        .push(Tap {
                            out: Output::Keys(core::slice::from_ref(&seq.codes[i])),
                            next: if last { drain } else { (2 * i + 2) as StateId },
                        })
                        .ok()?;
                    if !last {
                        nodes
                            .push(Delay {
                                delay_ms: seq.delay_ms,
                                next: (2 * i + 3) as StateId,
                                since: 0,
                            })
                            .ok()?;
                    }
                }
                nodes.push(Drain { next: 0 }).ok()?;
                nodes
            }
        };
        Some(Fsm { nodes, cur: 0 })
    }

    /// Is the machine sitting in its start state? Rebinding a position to a
    /// different action is only legal while this holds.
    pub fn is_idle(&self) -> bool {
        matches!(self.nodes.get(self.cur as usize), Some(Node::Start { .. }))
    }

    /// Force the machine back to start. Callers are expected to have
    /// released the sinks (`release_all`) first.
    pub fn reset(&mut self) {
        self.cur = 0;
        for node in self.nodes.iter_mut() {
            if let Node::Press { held, .. } = node {
                *held = false;
            }
        }
    }

    /// Drive the machine with this tick's input. `permissive_hold` is only
    /// set on arbiter injections; every state except an eligible `Wait`
    /// ignores it.
    pub fn step<S: HidSinks>(
        &mut self,
        input: bool,
        now: u32,
        permissive_hold: bool,
        sinks: &mut S,
    ) {
        let mut target = self.step_node(input, now, permissive_hold, sinks);
        while target != self.cur {
            self.cur = target;
            target = self.enter_node(now, sinks);
        }
    }

    fn step_node<S: HidSinks>(
        &mut self,
        input: bool,
        now: u32,
        permissive_hold: bool,
        sinks: &mut S,
    ) -> StateId {
        let cur = self.cur;
        match &mut self.nodes[cur as usize] {
            Node::Start { next } => {
                if input {
                    *next
                } else {
                    cur
                }
            }
            Node::Press { out, next, held } => {
                if input || !*held {
                    cur
                } else {
                    *held = false;
                    let out = *out;
                    let next = *next;
                    emit_release(out, sinks);
                    next
                }
            }
            Node::Tap { out, next } => {
                let (out, next) = (*out, *next);
                emit_tap(out, sinks);
                next
            }
            Node::Wait {
                timeout_ms,
                success,
                fail,
                inverted,
                permissive_ok,
                since,
            } => {
                let inp = if *inverted { !input } else { input };
                let elapsed = now.wrapping_sub(*since);
                if inp && *permissive_ok && permissive_hold {
                    *success
                } else if elapsed > *timeout_ms {
                    // Timer expired; the hold completed whether or not the
                    // release has been observed yet.
                    *success
                } else if !inp {
                    *fail
                } else {
                    cur
                }
            }
            Node::Glide { profile, next, vx, vy } => {
                if input {
                    let (x, y, dw) = (*vx, *vy, profile.dw);
                    let (ax, ay) = (profile.ax, profile.ay);
                    emit_move(x, y, dw, sinks);
                    *vx = x * ax;
                    *vy = y * ay;
                    cur
                } else {
                    *next
                }
            }
            Node::Delay {
                delay_ms,
                next,
                since,
            } => {
                if now.wrapping_sub(*since) >= *delay_ms {
                    *next
                } else {
                    cur
                }
            }
            Node::Drain { next } => {
                if input {
                    cur
                } else {
                    *next
                }
            }
        }
    }

    fn enter_node<S: HidSinks>(&mut self, now: u32, sinks: &mut S) -> StateId {
        let cur = self.cur;
        match &mut self.nodes[cur as usize] {
            Node::Start { .. } | Node::Drain { .. } => cur,
            Node::Press { out, held, .. } => {
                *held = true;
                let out = *out;
                emit_press(out, sinks);
                cur
            }
            Node::Tap { out, next } => {
                let (out, next) = (*out, *next);
                emit_tap(out, sinks);
                next
            }
            Node::Wait { since, .. } => {
                *since = now;
                cur
            }
            Node::Glide { profile, vx, vy, .. } => {
                let (x, y) = (profile.dx as f32, profile.dy as f32);
                emit_move(x, y, profile.dw, sinks);
                *vx = x * profile.ax;
                *vy = y * profile.ay;
                cur
            }
            Node::Delay { since, .. } => {
                *since = now;
                cur
            }
        }
    }
}

fn graph(nodes: &[Node]) -> Option<Vec<Node, MAX_STATES>> {
    Vec::from_slice(nodes).ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::{k, mm, mt, seq, td, Action, ModTap};
    use crate::hid::mock::{Emit, Recorder};
    use crate::key_code::KeyCode::*;

    fn drive(fsm: &mut Fsm, rec: &mut Recorder, input: bool, now: u32) {
        fsm.step(input, now, false, rec);
    }

    #[test]
    fn key_press_hold_release() {
        static ACT: Action = k(&[A]);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        assert_eq!(rec.take(), [Emit::Press(A)]);
        for t in 1..10 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 10);
        assert_eq!(rec.take(), [Emit::Release(A)]);
        assert!(fsm.is_idle());
    }

    #[test]
    fn chord_orders_press_and_release_as_declared() {
        static ACT: Action = k(&[LShift, Kb1]);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 1);
        assert_eq!(
            rec.take(),
            [
                Emit::Press(LShift),
                Emit::Press(Kb1),
                Emit::Release(LShift),
                Emit::Release(Kb1),
            ]
        );
    }

    #[test]
    fn consumer_release_is_release_all() {
        use crate::key_code::ConsumerCode;
        static ACT: Action = crate::action::cc(ConsumerCode::VolumeUp);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 5);
        assert_eq!(
            rec.take(),
            [
                Emit::ConsumerPress(ConsumerCode::VolumeUp),
                Emit::ConsumerRelease,
            ]
        );
    }

    #[test]
    fn mod_tap_quick_tap() {
        static ACT: Action = mt(A, &[LShift], 200);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        for t in 1..50 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 50);
        assert_eq!(rec.take(), [Emit::Press(A), Emit::Release(A)]);
        assert!(fsm.is_idle());
    }

    #[test]
    fn mod_tap_hold_by_timeout() {
        static ACT: Action = mt(A, &[LShift], 200);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        for t in 0..=200 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, true, 201);
        assert_eq!(rec.take(), [Emit::Press(LShift)]);
        for t in 202..400 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 400);
        assert_eq!(rec.take(), [Emit::Release(LShift)]);
    }

    #[test]
    fn mod_tap_release_after_timeout_is_a_hold() {
        // Release observed on the first tick past the timeout: the hold
        // completed before the release was seen, so it still commits; the
        // release goes out on the following step.
        static ACT: Action = mt(A, &[LShift], 200);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        for t in 0..=200 {
            drive(&mut fsm, &mut rec, true, t);
        }
        drive(&mut fsm, &mut rec, false, 201);
        assert_eq!(rec.take(), [Emit::Press(LShift)]);
        drive(&mut fsm, &mut rec, false, 202);
        assert_eq!(rec.take(), [Emit::Release(LShift)]);
    }

    #[test]
    fn mod_tap_permissive_commits_early() {
        static ACT: Action = mt(A, &[LShift], 200);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        fsm.step(true, 30, true, &mut rec);
        assert_eq!(rec.take(), [Emit::Press(LShift)]);
        drive(&mut fsm, &mut rec, false, 100);
        assert_eq!(rec.take(), [Emit::Release(LShift)]);
    }

    #[test]
    fn mod_tap_without_permissive_ignores_injection() {
        static ACT: Action = Action::ModTap(ModTap {
            tap: A,
            hold: &[LShift],
            timeout_ms: 200,
            hold_is_tap: false,
            permissive: false,
        });
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        fsm.step(true, 30, true, &mut rec);
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 60);
        assert_eq!(rec.take(), [Emit::Press(A), Emit::Release(A)]);
    }

    #[test]
    fn mod_tap_hold_is_tap_taps_the_chord() {
        static ACT: Action = Action::ModTap(ModTap {
            tap: Space,
            hold: &[LCtrl, B],
            timeout_ms: 150,
            hold_is_tap: true,
            permissive: true,
        });
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        for t in 0..=151 {
            drive(&mut fsm, &mut rec, true, t);
        }
        // The hold chord fires as a tap and the machine drops straight back
        // to start even though the key is still down.
        assert_eq!(
            rec.take(),
            [
                Emit::Press(LCtrl),
                Emit::Press(B),
                Emit::Release(LCtrl),
                Emit::Release(B),
            ]
        );
        // Still-held key immediately re-arms from start.
        drive(&mut fsm, &mut rec, true, 152);
        assert!(!fsm.is_idle());
    }

    fn dance() -> &'static Action {
        static ACT: Action = td(A, &[LCtrl], B, &[LCtrl, LAlt], 200);
        &ACT
    }

    #[test]
    fn tap_dance_first_hold() {
        let mut fsm = Fsm::for_action(dance()).unwrap();
        let mut rec = Recorder::default();
        for t in 0..=201 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert_eq!(rec.take(), [Emit::Press(LCtrl)]);
        drive(&mut fsm, &mut rec, false, 250);
        assert_eq!(rec.take(), [Emit::Release(LCtrl)]);
    }

    #[test]
    fn tap_dance_single_tap_fires_after_the_gap() {
        let mut fsm = Fsm::for_action(dance()).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 50);
        for t in 51..=250 {
            drive(&mut fsm, &mut rec, false, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 251);
        assert_eq!(rec.take(), [Emit::Press(A), Emit::Release(A)]);
        assert!(fsm.is_idle());
    }

    #[test]
    fn tap_dance_double_tap() {
        let mut fsm = Fsm::for_action(dance()).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 50);
        drive(&mut fsm, &mut rec, true, 80);
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 120);
        assert_eq!(rec.take(), [Emit::Press(B), Emit::Release(B)]);
    }

    #[test]
    fn tap_dance_second_hold() {
        let mut fsm = Fsm::for_action(dance()).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 50);
        drive(&mut fsm, &mut rec, true, 80);
        for t in 81..=281 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert_eq!(rec.take(), [Emit::Press(LCtrl), Emit::Press(LAlt)]);
        drive(&mut fsm, &mut rec, false, 400);
        assert_eq!(rec.take(), [Emit::Release(LCtrl), Emit::Release(LAlt)]);
    }

    #[test]
    fn glide_accelerates_and_stops_on_release() {
        static ACT: Action = mm(7, 0, 0, 1.2, 1.2);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, true, 1);
        drive(&mut fsm, &mut rec, true, 2);
        assert_eq!(
            rec.take(),
            [
                Emit::MouseMove(7, 0, 0),
                Emit::MouseMove(8, 0, 0),
                Emit::MouseMove(10, 0, 0),
            ]
        );
        drive(&mut fsm, &mut rec, false, 3);
        drive(&mut fsm, &mut rec, false, 4);
        assert!(rec.take().is_empty());
        assert!(fsm.is_idle());
    }

    #[test]
    fn glide_velocity_clamps_to_report_range() {
        static ACT: Action = mm(100, -100, 3, 2.0, 2.0);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, true, 1);
        assert_eq!(
            rec.take(),
            [
                Emit::MouseMove(100, -100, 3),
                Emit::MouseMove(127, -128, 3),
            ]
        );
    }

    #[test]
    fn sequence_taps_in_order_with_minimum_gap() {
        static ACT: Action = seq(&[Dot, Dot, Slash], 20);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        assert_eq!(rec.take(), [Emit::Press(Dot), Emit::Release(Dot)]);
        for t in 1..20 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, true, 20);
        assert_eq!(rec.take(), [Emit::Press(Dot), Emit::Release(Dot)]);
        for t in 21..40 {
            drive(&mut fsm, &mut rec, true, t);
        }
        drive(&mut fsm, &mut rec, true, 40);
        assert_eq!(rec.take(), [Emit::Press(Slash), Emit::Release(Slash)]);
        // Holding past the last tap does not retrigger.
        for t in 41..200 {
            drive(&mut fsm, &mut rec, true, t);
        }
        assert!(rec.take().is_empty());
        drive(&mut fsm, &mut rec, false, 200);
        assert!(fsm.is_idle());
    }

    #[test]
    fn sequence_finishes_after_early_release() {
        static ACT: Action = seq(&[A, B], 20);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        drive(&mut fsm, &mut rec, false, 5);
        for t in 6..20 {
            drive(&mut fsm, &mut rec, false, t);
        }
        assert_eq!(rec.take(), [Emit::Press(A), Emit::Release(A)]);
        drive(&mut fsm, &mut rec, false, 20);
        assert_eq!(rec.take(), [Emit::Press(B), Emit::Release(B)]);
        drive(&mut fsm, &mut rec, false, 21);
        assert!(fsm.is_idle());
    }

    #[test]
    fn sink_rejection_does_not_derail_the_machine() {
        static ACT: Action = k(&[A]);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        rec.reject_key_presses = true;
        drive(&mut fsm, &mut rec, true, 0);
        rec.reject_key_presses = false;
        // The release still goes out even though the press was refused.
        drive(&mut fsm, &mut rec, false, 10);
        assert_eq!(rec.take(), [Emit::Press(A), Emit::Release(A)]);
        assert!(fsm.is_idle());
    }

    #[test]
    fn reset_returns_to_start_and_clears_held_flags() {
        static ACT: Action = k(&[A]);
        let mut fsm = Fsm::for_action(&ACT).unwrap();
        let mut rec = Recorder::default();
        drive(&mut fsm, &mut rec, true, 0);
        assert!(!fsm.is_idle());
        fsm.reset();
        assert!(fsm.is_idle());
        rec.take();
        // A fresh press works normally; no stale release is emitted first.
        drive(&mut fsm, &mut rec, true, 10);
        assert_eq!(rec.take(), [Emit::Press(A)]);
    }
}
