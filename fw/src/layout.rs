//! The Tandem keymap.
//!
//! Three layers: `base` (QWERTY with home-row mods and a shift dance on the
//! left pinky), `nav` (arrows and the mouse, on the left thumb), `num`
//! (digits, F-keys and media, on the right thumb). Overlay entries marked
//! `TR` fall through to base.

use tandem_core::action::{cc, k, lh, mb, mm, mt, seq, td, Action};
use tandem_core::key_code::ConsumerCode::*;
use tandem_core::key_code::KeyCode::*;
use tandem_core::key_code::MouseButtons;
use tandem_core::keymap::Layer;

pub const BASE: usize = 0;
pub const NAV: usize = 1;
pub const NUM: usize = 2;

const __: Action = Action::NoOp;
const TR: Action = Action::Trans;

/// Hold timeout for the home-row mods and the shift dance.
const HOLD_MS: u32 = 180;

/// Initial cursor speed and per-tick acceleration for the glide keys.
const CUR: i16 = 6;
const ACC: f32 = 1.15;

#[rustfmt::skip]
pub static LAYERS: [Layer; 3] = [
    Layer {
        name: "base",
        keys: [
            [ // left: pinky outer column first
                [k(&[Tab]),   k(&[Q]), k(&[W]), k(&[E]), k(&[R]), k(&[T])],
                [k(&[Grave]), mt(A, &[LGui], HOLD_MS), mt(S, &[LAlt], HOLD_MS), mt(D, &[LCtrl], HOLD_MS), mt(F, &[LShift], HOLD_MS), k(&[G])],
                // Tapped: escape. Held: shift. Double-tapped: caps lock.
                [td(Escape, &[LShift], CapsLock, &[LShift], HOLD_MS), k(&[Z]), k(&[X]), k(&[C]), k(&[V]), k(&[B])],
                [__, __, __, lh(NAV), k(&[Space]), k(&[LCtrl])],
            ],
            [ // right: pointer inner column first
                [k(&[Y]), k(&[U]), k(&[I]), k(&[O]), k(&[P]), k(&[BSpace])],
                [k(&[H]), mt(J, &[RShift], HOLD_MS), mt(K, &[RCtrl], HOLD_MS), mt(L, &[RAlt], HOLD_MS), mt(SColon, &[RGui], HOLD_MS), k(&[Quote])],
                [k(&[N]), k(&[M]), k(&[Comma]), k(&[Dot]), k(&[Slash]), k(&[LShift, Minus])],
                [k(&[Enter]), lh(NUM), __, __, __, __],
            ],
        ],
    },
    Layer {
        name: "nav",
        keys: [
            [ // left: mouse cluster under the resting fingers
                [TR, TR,                      mm(0, -CUR, 0, ACC, ACC), TR,                      mm(0, 0, 1, 1.0, 1.0),  TR],
                [TR, mm(-CUR, 0, 0, ACC, ACC), mm(0, CUR, 0, ACC, ACC), mm(CUR, 0, 0, ACC, ACC), mm(0, 0, -1, 1.0, 1.0), TR],
                [TR, mb(MouseButtons::LEFT), mb(MouseButtons::MIDDLE), mb(MouseButtons::RIGHT), TR, TR],
                [TR, TR, TR, TR, TR, TR],
            ],
            [ // right: navigation
                [TR,         k(&[Home]), k(&[PgDown]), k(&[PgUp]), k(&[End]),   k(&[Delete])],
                [k(&[Left]), k(&[Down]), k(&[Up]),     k(&[Right]), TR,         TR],
                // Types "../" for climbing directories.
                [seq(&[Dot, Dot, Slash], 15), TR, TR, TR, TR, TR],
                [TR, TR, TR, TR, TR, TR],
            ],
        ],
    },
    Layer {
        name: "num",
        keys: [
            [ // left: digits and media
                [TR, k(&[Kb1]),          k(&[Kb2]),         k(&[Kb3]),          k(&[Kb4]),       k(&[Kb5])],
                [TR, cc(ScanPrevious),   cc(PlayPause),     cc(ScanNext),       cc(Mute),        TR],
                [TR, cc(BrightnessDown), cc(BrightnessUp),  cc(VolumeDown),     cc(VolumeUp),    TR],
                [TR, TR, TR, TR, TR, TR],
            ],
            [ // right: digits and F-keys
                [k(&[Kb6]), k(&[Kb7]), k(&[Kb8]), k(&[Kb9]), k(&[Kb0]),  TR],
                [k(&[F1]),  k(&[F2]),  k(&[F3]),  k(&[F4]),  k(&[F5]),   k(&[F6])],
                [k(&[F7]),  k(&[F8]),  k(&[F9]),  k(&[F10]), k(&[F11]),  k(&[F12])],
                [TR, TR, TR, TR, TR, TR],
            ],
        ],
    },
];
