//! The left half: a matrix-to-serial pump.
//!
//! Scans at 250 Hz, debounces locally, and writes one frame per scan down
//! the link. No USB, no engine; the right half does all the thinking.
#![no_main]
#![no_std]

use nb::block;
use panic_halt as _;
use rtic::app;
use stm32f1xx_hal::prelude::*;
use stm32f1xx_hal::serial::Tx;
use stm32f1xx_hal::timer::CountDownTimer;

use tandem_core::debounce::Debounce;
use tandem_core::link::encode;
use tandem_core::{COLS, ROWS};

use tandem_fw::{scan_matrix, Cols, Rows, ScanMatrix, DEBOUNCE_STABLE_MS, LINK_BAUD};

/// Milliseconds per scan. 250 Hz leaves room for the frame on the wire:
/// 25 bytes of 8-N-1 are 250 bits, about 2.2 ms at 115 200 bps, so a
/// blocking write always finishes inside the 4 ms budget.
const TICK_MS: u32 = 4;

/// The pump's working state, bundled as one resource.
pub struct Pump {
    pub tx: Tx<stm32f1xx_hal::pac::USART3>,
    pub debounce: [[Debounce; COLS]; ROWS],
    pub now: u32,
}

#[app(device = stm32f1xx_hal::pac, peripherals = true)]
mod app {
    use super::*;
    use stm32f1xx_hal::pac::TIM2;
    use stm32f1xx_hal::serial::{Config, Serial};
    use stm32f1xx_hal::timer::{Event, Timer};

    #[resources]
    struct Resources {
        pump: Pump,
        matrix: ScanMatrix,
        timer: CountDownTimer<TIM2>,
    }

    #[init]
    fn init(c: init::Context) -> (init::LateResources, init::Monotonics) {
        let mut flash = c.device.FLASH.constrain();
        let mut rcc = c.device.RCC.constrain();

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
        let (tx, _) = serial.split();

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
            Timer::tim2(c.device.TIM2, &clocks, &mut rcc.apb1).start_count_down(250.hz());
        timer.listen(Event::Update);

        (
            init::LateResources {
                matrix,
                timer,
                pump: Pump {
                    tx,
                    debounce: Debounce::grid(),
                    now: 0,
                },
            },
            init::Monotonics(),
        )
    }

    #[task(binds = TIM2, priority = 1, resources = [pump, matrix, timer])]
    fn tick(mut c: tick::Context) {
        let tick::Resources {
            ref mut pump,
            ref mut matrix,
            ref mut timer,
        } = c.resources;
        timer.lock(|t| t.clear_update_interrupt_flag());

        let raw = matrix.lock(|m| {
            match m.scan_with_delay(|| cortex_m::asm::delay(16)) {
                Ok(scan) => scan,
                Err(e) => match e {},
            }
        });

        pump.lock(|Pump { tx, debounce, now }| {
            *now = now.wrapping_add(TICK_MS);
            let mut half = [[false; COLS]; ROWS];
            for (r, row) in raw.iter().enumerate() {
                for (col, &pressed) in row.iter().enumerate() {
                    half[r][col] = debounce[r][col].step(pressed, *now, DEBOUNCE_STABLE_MS);
                }
            }
            // NOTE: The blocking writes here are still real time: the
            // whole frame fits in the first ~2.2 ms of the 4 ms scan
            // period, and the UART has nothing else to say.
            for &byte in encode(&half).iter() {
                match block!(tx.write(byte)) {
                    Ok(()) => (),
                    // The error type is `Infallible`.
                    Err(_) => unreachable!(),
                }
            }
        });
    }
}
