//! The three HID sinks, as one explicit context.
//!
//! The engine never talks to USB directly; every emit goes through this
//! trait. The firmware implements it over the real endpoints, tests
//! implement it with a recorder. Sink errors are advisory: callers log and
//! carry on, and state machines never roll back on a failed emit: the
//! matching release will be issued anyway and the sink is expected to
//! ignore a release it never saw the press for.

use crate::key_code::{ConsumerCode, KeyCode, MouseButtons};

/// Why an emit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// More simultaneous non-modifier keys than the report can carry.
    Rollover,
    /// The transport dropped the report (endpoint busy, not enumerated).
    Bus,
}

/// The keyboard, consumer-control and mouse endpoints.
pub trait HidSinks {
    /// Press every usage in `chord`, in order.
    fn key_press(&mut self, chord: &[KeyCode]) -> Result<(), SinkError>;
    /// Release every usage in `chord`, in order.
    fn key_release(&mut self, chord: &[KeyCode]) -> Result<(), SinkError>;
    /// Report a consumer usage.
    fn consumer_press(&mut self, code: ConsumerCode) -> Result<(), SinkError>;
    /// Clear the consumer report. The consumer endpoint has no partial
    /// release.
    fn consumer_release(&mut self) -> Result<(), SinkError>;
    /// Press mouse buttons.
    fn mouse_press(&mut self, buttons: MouseButtons) -> Result<(), SinkError>;
    /// Release mouse buttons.
    fn mouse_release(&mut self, buttons: MouseButtons) -> Result<(), SinkError>;
    /// Relative cursor/wheel movement.
    fn mouse_move(&mut self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError>;
    /// Release everything on every endpoint. Used on (re)initialization.
    fn release_all(&mut self);
}

#[cfg(test)]
pub(crate) mod mock {
    //! A recording sink for driving the engine in tests.

    use super::*;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Emit {
        Press(KeyCode),
        Release(KeyCode),
        ConsumerPress(ConsumerCode),
        ConsumerRelease,
        MousePress(u8),
        MouseRelease(u8),
        MouseMove(i8, i8, i8),
        ReleaseAll,
    }

    /// Records every emit in order. Individual chord members are recorded
    /// separately so tests can assert press/release ordering.
    #[derive(Default)]
    pub struct Recorder {
        pub emits: Vec<Emit>,
        /// When set, key presses report rollover (the emit is still
        /// recorded, as a real sink would have sent the partial report).
        pub reject_key_presses: bool,
    }

    impl Recorder {
        pub fn take(&mut self) -> Vec<Emit> {
            std::mem::take(&mut self.emits)
        }

        /// Every press has a later matching release and the consumer/mouse
        /// endpoints end up cleared.
        pub fn assert_balanced(&self) {
            let mut down: Vec<KeyCode> = Vec::new();
            let mut consumer = false;
            let mut buttons = 0u8;
            for e in &self.emits {
                match e {
                    Emit::Press(kc) => down.push(*kc),
                    Emit::Release(kc) => {
                        let at = down
                            .iter()
                            .position(|d| d == kc)
                            .unwrap_or_else(|| panic!("release of un-pressed {:?}", kc));
                        down.remove(at);
                    }
                    Emit::ConsumerPress(_) => consumer = true,
                    Emit::ConsumerRelease => consumer = false,
                    Emit::MousePress(b) => buttons |= b,
                    Emit::MouseRelease(b) => buttons &= !b,
                    Emit::MouseMove(..) => {}
                    Emit::ReleaseAll => {
                        down.clear();
                        consumer = false;
                        buttons = 0;
                    }
                }
            }
            assert!(down.is_empty(), "keys left pressed: {:?}", down);
            assert!(!consumer, "consumer usage left pressed");
            assert_eq!(buttons, 0, "mouse buttons left pressed");
        }
    }

    impl HidSinks for Recorder {
        fn key_press(&mut self, chord: &[KeyCode]) -> Result<(), SinkError> {
            for &kc in chord {
                self.emits.push(Emit::Press(kc));
            }
            if self.reject_key_presses {
                Err(SinkError::Rollover)
            } else {
                Ok(())
            }
        }

        fn key_release(&mut self, chord: &[KeyCode]) -> Result<(), SinkError> {
            for &kc in chord {
                self.emits.push(Emit::Release(kc));
            }
            Ok(())
        }

        fn consumer_press(&mut self, code: ConsumerCode) -> Result<(), SinkError> {
            self.emits.push(Emit::ConsumerPress(code));
            Ok(())
        }

        fn consumer_release(&mut self) -> Result<(), SinkError> {
            self.emits.push(Emit::ConsumerRelease);
            Ok(())
        }

        fn mouse_press(&mut self, buttons: MouseButtons) -> Result<(), SinkError> {
            self.emits.push(Emit::MousePress(buttons.0));
            Ok(())
        }

        fn mouse_release(&mut self, buttons: MouseButtons) -> Result<(), SinkError> {
            self.emits.push(Emit::MouseRelease(buttons.0));
            Ok(())
        }

        fn mouse_move(&mut self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError> {
            self.emits.push(Emit::MouseMove(dx, dy, wheel));
            Ok(())
        }

        fn release_all(&mut self) {
            self.emits.push(Emit::ReleaseAll);
        }
    }
}
