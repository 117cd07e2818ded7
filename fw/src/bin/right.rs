//! The right half: USB composite device plus the input engine.
//!
//! A 1 kHz timer drives the tick task: scan the local matrix, merge the
//! freshest frame from the left half, run the engine. The serial interrupt
//! feeds the frame reassembler; the USB interrupts service the endpoints.
#![no_main]
#![no_std]

use panic_halt as _;
use rtic::app;
use stm32f1xx_hal::prelude::*;
use stm32f1xx_hal::serial::Rx;
use stm32f1xx_hal::timer::CountDownTimer;
use stm32f1xx_hal::usb::{Peripheral, UsbBus, UsbBusType};
use usb_device::bus::UsbBusAllocator;
use usb_device::device::UsbDeviceState;

use tandem_core::debounce::Debounce;
use tandem_core::keymap::Keymap;
use tandem_core::link::LinkBuffer;
use tandem_core::runtime::Runtime;
use tandem_core::{COLS, ROWS};

use tandem_fw::layout::LAYERS;
use tandem_fw::{
    new_device, scan_matrix, Cols, Rows, ScanMatrix, UsbDevice, UsbHid, DEBOUNCE_STABLE_MS,
    LINK_BAUD,
};

/// The engine and its per-tick working state, bundled as one resource.
pub struct Engine {
    pub runtime: Runtime,
    pub debounce: [[Debounce; COLS]; ROWS],
    pub now: u32,
}

#[app(device = stm32f1xx_hal::pac, peripherals = true)]
mod app {
    use super::*;
    use embedded_hal::digital::v2::OutputPin;
    use stm32f1xx_hal::pac::{TIM2, USART3};
    use stm32f1xx_hal::serial::{Config, Serial};
    use stm32f1xx_hal::timer::{Event, Timer};

    #[resources]
    struct Resources {
        usb_dev: UsbDevice,
        hid: UsbHid,
        engine: Engine,
        link: LinkBuffer,
        rx: Rx<USART3>,
        matrix: ScanMatrix,
        timer: CountDownTimer<TIM2>,
    }

    #[init]
    fn init(c: init::Context) -> (init::LateResources, init::Monotonics) {
        static mut USB_BUS: Option<UsbBusAllocator<UsbBusType>> = None;

        let mut flash = c.device.FLASH.constrain();
        let mut rcc = c.device.RCC.constrain();

        // A bad keymap must never reach the runtime; die loudly at boot.
        let keymap = match Keymap::new(&LAYERS) {
            Ok(keymap) => keymap,
            Err(e) => panic!("keymap rejected: {}", e),
        };

        let clocks = rcc
            .cfgr
            .use_hse(8_u32.mhz())
            .sysclk(72_u32.mhz())
            .pclk1(36_u32.mhz())
            .freeze(&mut flash.acr);

        let mut gpioa = c.device.GPIOA.split(&mut rcc.apb2);
        let mut gpiob = c.device.GPIOB.split(&mut rcc.apb2);
        let mut afio = c.device.AFIO.constrain(&mut rcc.apb2);
        let (_, pb3, pb4) = afio.mapr.disable_jtag(gpioa.pa15, gpiob.pb3, gpiob.pb4);

        // BluePill board has a pull-up resistor on the D+ line.
        // Pull the D+ pin down to send a RESET condition to the USB bus.
        let mut usb_dp = gpioa.pa12.into_push_pull_output(&mut gpioa.crh);
        // If we can't do this, we can't be a keyboard, so we _should_ panic
        // if this fails
        match usb_dp.set_low() {
            Ok(_) => (),
            Err(_) => panic!(),
        };
        cortex_m::asm::delay(clocks.sysclk().0 / 100);

        let usb = Peripheral {
            usb: c.device.USB,
            pin_dm: gpioa.pa11,
            pin_dp: usb_dp.into_floating_input(&mut gpioa.crh),
        };

        *USB_BUS = Some(UsbBus::new(usb));
        let usb_bus = match USB_BUS.as_ref() {
            Some(ub) => ub,
            None => panic!(),
        };

        let hid = UsbHid::new(usb_bus);
        let usb_dev = new_device(usb_bus);

        let pin_tx = gpiob.pb10.into_alternate_push_pull(&mut gpiob.crh);
        let pin_rx = gpiob.pb11;

        let serial = Serial::usart3(
            c.device.USART3,
            (pin_tx, pin_rx),
            &mut afio.mapr,
            Config::default().baudrate(LINK_BAUD.bps()),
            clocks,
            &mut rcc.apb1,
        );
        let (_, mut rx) = serial.split();
        rx.listen();

        let rows = Rows(
            gpioa.pa0.into_push_pull_output(&mut gpioa.crl).downgrade(),
            gpioa.pa1.into_push_pull_output(&mut gpioa.crl).downgrade(),
            gpioa.pa2.into_push_pull_output(&mut gpioa.crl).downgrade(),
            gpioa.pa3.into_push_pull_output(&mut gpioa.crl).downgrade(),
        );
        #[rustfmt::skip]
        let cols = Cols(
                  pb3.into_pull_up_input(&mut gpiob.crl).downgrade(),
                  pb4.into_pull_up_input(&mut gpiob.crl).downgrade(),
            gpiob.pb5.into_pull_up_input(&mut gpiob.crl).downgrade(),
            gpiob.pb6.into_pull_up_input(&mut gpiob.crl).downgrade(),
            gpiob.pb7.into_pull_up_input(&mut gpiob.crl).downgrade(),
            gpiob.pb8.into_pull_up_input(&mut gpiob.crh).downgrade(),
        );
        let matrix = scan_matrix(rows, cols);

        let mut timer =
            Timer::tim2(c.device.TIM2, &clocks, &mut rcc.apb1).start_count_down(1.khz());
        timer.listen(Event::Update);

        (
            init::LateResources {
                usb_dev,
                hid,
                link: LinkBuffer::new(),
                rx,
                matrix,
                timer,
                engine: Engine {
                    runtime: Runtime::new(keymap),
                    debounce: Debounce::grid(),
                    now: 0,
                },
            },
            init::Monotonics(),
        )
    }

    #[task(binds = USB_HP_CAN_TX, priority = 3, resources = [usb_dev, hid])]
    fn usb_tx(mut c: usb_tx::Context) {
        let usb_tx::Resources {
            ref mut usb_dev,
            ref mut hid,
        } = c.resources;
        (usb_dev, hid).lock(|dev, hid| hid.poll(dev));
    }

    #[task(binds = USB_LP_CAN_RX0, priority = 3, resources = [usb_dev, hid])]
    fn usb_rx(mut c: usb_rx::Context) {
        let usb_rx::Resources {
            ref mut usb_dev,
            ref mut hid,
        } = c.resources;
        (usb_dev, hid).lock(|dev, hid| hid.poll(dev));
    }

    #[task(binds = USART3, priority = 2, resources = [rx, link])]
    fn uart_rx(mut c: uart_rx::Context) {
        let uart_rx::Resources {
            ref mut rx,
            ref mut link,
        } = c.resources;
        (rx, link).lock(|rx, link| loop {
            match rx.read() {
                Ok(byte) => link.push(byte),
                Err(nb::Error::WouldBlock) => break,
                // Framing/noise/overrun: whatever is mid-line is garbage.
                // Count it and resynchronize on the next newline.
                Err(nb::Error::Other(_)) => {
                    link.note_line_error();
                    break;
                }
            }
        });
    }

    #[task(binds = TIM2, priority = 1, resources = [usb_dev, hid, engine, link, matrix, timer])]
    fn tick(mut c: tick::Context) {
        let tick::Resources {
            ref mut usb_dev,
            ref mut hid,
            ref mut engine,
            ref mut link,
            ref mut matrix,
            ref mut timer,
        } = c.resources;
        timer.lock(|t| t.clear_update_interrupt_flag());

        // No work at all until the host has enumerated us.
        if !usb_dev.lock(|dev| dev.state() == UsbDeviceState::Configured) {
            return;
        }

        let raw = matrix.lock(|m| {
            match m.scan_with_delay(|| cortex_m::asm::delay(16)) {
                Ok(scan) => scan,
                Err(e) => match e {},
            }
        });
        let (left, bad_frames) = link.lock(|link| (*link.state(), link.bad_frames()));

        (engine, hid).lock(|engine, hid| {
            engine.now = engine.now.wrapping_add(1);
            let now = engine.now;
            let mut right = [[false; COLS]; ROWS];
            for (r, row) in raw.iter().enumerate() {
                for (col, &pressed) in row.iter().enumerate() {
                    right[r][col] = engine.debounce[r][col].step(pressed, now, DEBOUNCE_STABLE_MS);
                }
            }
            engine.runtime.record_bad_frames(bad_frames);
            engine.runtime.tick(&[left, right], now, hid);
        });
    }
}
