//! Hardware glue for the Tandem halves: pin bundles, the USB composite
//! device, and the [`HidSinks`] implementation over its three endpoints.
//!
//! Both halves are STM32F103 blue pill boards. The right half carries USB
//! and the engine; the left half only scans and pumps frames down the
//! serial link.
#![no_std]

use stm32f1xx_hal::gpio::{Input, Output, PullUp, PushPull, Pxx};
use stm32f1xx_hal::usb::UsbBusType;
use usb_device::bus::UsbBusAllocator;
use usb_device::device::{UsbDeviceBuilder, UsbVidPid};
use usbd_hid::descriptor::{
    KeyboardReport, MediaKeyboardReport, MouseReport, SerializedDescriptor,
};
use usbd_hid::hid_class::HIDClass;

use tandem_core::hid::{HidSinks, SinkError};
use tandem_core::key_code::{ConsumerCode, KeyCode, MouseButtons};
use tandem_core::matrix::Matrix;
use tandem_core::{COLS, ROWS};

pub mod layout;

/// Between the halves runs a TRRS cable carrying one-way serial. Higher
/// rates were not reliable over that cable, and one frame per scan fits
/// comfortably at this one.
///
/// Use by calling `.bps()` on this value.
pub const LINK_BAUD: u32 = 115_200;

/// Hold-off window for the eager debouncer, both halves.
pub const DEBOUNCE_STABLE_MS: u32 = 5;

/// USB VID/PID for a generic keyboard from
/// <https://github.com/obdev/v-usb/blob/master/usbdrv/USB-IDs-for-free.txt>
const VID: u16 = 0x16c0;
const PID: u16 = 0x27db;

/// Type alias for usb devices.
pub type UsbDevice = usb_device::device::UsbDevice<'static, UsbBusType>;

pub type RowPin = Pxx<Output<PushPull>>;
pub type ColPin = Pxx<Input<PullUp>>;

/// The scanner both halves run, over type-erased pins.
pub type ScanMatrix = Matrix<RowPin, ColPin, ROWS, COLS>;

/// Driven rows of the key matrix.
///
/// Pin | Wiring for both halves
/// ----|------------------------
/// PA0 | Top letter row
/// PA1 | Home row
/// PA2 | Bottom letter row
/// PA3 | Thumb row
pub struct Rows(pub RowPin, pub RowPin, pub RowPin, pub RowPin);

/// Read columns of the key matrix. The two halves mirror each other, so
/// the same six pins land on opposite fingers; the keymap tables are
/// written in wiring order, which reads left-to-right on both halves.
///
/// Pin | Left half wiring    | Right half wiring
/// ----|---------------------|--------------------
/// PB3 | Pinky outer column  | Pointer inner column
/// PB4 | Pinky home column   | Pointer home column
/// PB5 | Ring home column    | Middle home column
/// PB6 | Middle home column  | Ring home column
/// PB7 | Pointer home column | Pinky home column
/// PB8 | Pointer inner column| Pinky outer column
pub struct Cols(
    pub ColPin,
    pub ColPin,
    pub ColPin,
    pub ColPin,
    pub ColPin,
    pub ColPin,
);

/// Bundle the pins into a scanner with every row parked high.
pub fn scan_matrix(rows: Rows, cols: Cols) -> ScanMatrix {
    let rows = [rows.0, rows.1, rows.2, rows.3];
    let cols = [cols.0, cols.1, cols.2, cols.3, cols.4, cols.5];
    match Matrix::new(rows, cols) {
        Ok(matrix) => matrix,
        // Pin operations on this part are infallible.
        Err(e) => match e {},
    }
}

/// Constructor for the composite USB keyboard device.
pub fn new_device(bus: &'static UsbBusAllocator<UsbBusType>) -> UsbDevice {
    UsbDeviceBuilder::new(bus, UsbVidPid(VID, PID))
        .manufacturer("tandem")
        .product("Tandem Split Keyboard")
        .serial_number(env!("CARGO_PKG_VERSION"))
        .build()
}

/// The three HID endpoints plus the report state behind them.
///
/// The engine's emits mutate the report state; a report is pushed whenever
/// it changes. A press that would need a seventh non-modifier slot is
/// refused whole ([`SinkError::Rollover`]) and the report stays as it was;
/// the engine keeps its own state and the matching release later is simply
/// a no-op here.
pub struct UsbHid {
    keyboard: HIDClass<'static, UsbBusType>,
    consumer: HIDClass<'static, UsbBusType>,
    mouse: HIDClass<'static, UsbBusType>,
    modifier: u8,
    keys: [u8; 6],
    buttons: u8,
}

impl UsbHid {
    pub fn new(bus: &'static UsbBusAllocator<UsbBusType>) -> Self {
        UsbHid {
            keyboard: HIDClass::new(bus, KeyboardReport::desc(), 10),
            consumer: HIDClass::new(bus, MediaKeyboardReport::desc(), 10),
            mouse: HIDClass::new(bus, MouseReport::desc(), 10),
            modifier: 0,
            keys: [0; 6],
            buttons: 0,
        }
    }

    /// Poll the device with all three classes. Called from the USB
    /// interrupts.
    pub fn poll(&mut self, usb_dev: &mut UsbDevice) {
        usb_dev.poll(&mut [&mut self.keyboard, &mut self.consumer, &mut self.mouse]);
    }

    fn push_keyboard(&mut self) -> Result<(), SinkError> {
        let report = KeyboardReport {
            modifier: self.modifier,
            reserved: 0,
            leds: 0,
            keycodes: self.keys,
        };
        self.keyboard
            .push_input(&report)
            .map(|_| ())
            .map_err(|_| SinkError::Bus)
    }

    fn push_consumer(&mut self, usage_id: u16) -> Result<(), SinkError> {
        self.consumer
            .push_input(&MediaKeyboardReport { usage_id })
            .map(|_| ())
            .map_err(|_| SinkError::Bus)
    }

    fn push_mouse(&mut self, x: i8, y: i8, wheel: i8) -> Result<(), SinkError> {
        let report = MouseReport {
            buttons: self.buttons,
            x,
            y,
            wheel,
            pan: 0,
        };
        self.mouse
            .push_input(&report)
            .map(|_| ())
            .map_err(|_| SinkError::Bus)
    }
}

impl HidSinks for UsbHid {
    fn key_press(&mut self, chord: &[KeyCode]) -> Result<(), SinkError> {
        let mut modifier = self.modifier;
        let mut keys = self.keys;
        for &kc in chord {
            if let Some(bit) = kc.modifier_bit() {
                modifier |= bit;
                continue;
            }
            let usage = kc as u8;
            if keys.iter().any(|&slot| slot == usage) {
                continue;
            }
            match keys.iter_mut().find(|slot| **slot == 0) {
                Some(slot) => *slot = usage,
                None => return Err(SinkError::Rollover),
            }
        }
        self.modifier = modifier;
        self.keys = keys;
        self.push_keyboard()
    }

    fn key_release(&mut self, chord: &[KeyCode]) -> Result<(), SinkError> {
        for &kc in chord {
            if let Some(bit) = kc.modifier_bit() {
                self.modifier &= !bit;
                continue;
            }
            let usage = kc as u8;
            for slot in self.keys.iter_mut() {
                if *slot == usage {
                    *slot = 0;
                }
            }
        }
        self.push_keyboard()
    }

    fn consumer_press(&mut self, code: ConsumerCode) -> Result<(), SinkError> {
        self.push_consumer(code as u16)
    }

    fn consumer_release(&mut self) -> Result<(), SinkError> {
        self.push_consumer(0)
    }

    fn mouse_press(&mut self, buttons: MouseButtons) -> Result<(), SinkError> {
        self.buttons |= buttons.0;
        self.push_mouse(0, 0, 0)
    }

    fn mouse_release(&mut self, buttons: MouseButtons) -> Result<(), SinkError> {
        self.buttons &= !buttons.0;
        self.push_mouse(0, 0, 0)
    }

    fn mouse_move(&mut self, dx: i8, dy: i8, wheel: i8) -> Result<(), SinkError> {
        self.push_mouse(dx, dy, wheel)
    }

    fn release_all(&mut self) {
        self.modifier = 0;
        self.keys = [0; 6];
        self.buttons = 0;
        let _ = self.push_keyboard();
        let _ = self.push_consumer(0);
        let _ = self.push_mouse(0, 0, 0);
    }
}
