//! Board bindings for the capacitive tester bench MCU.
//!
//! Wiring (STM32G0B1KE):
//! - PA4 drives the capacitive plate (orange wire), idle low.
//! - PA0 senses the wall-sensor LED (white wire), pulled up, rising-edge
//!   interrupt via EXTI0.
//! - PA2 is USART2 TX carrying the observer stream at 115200 baud.

use core::cell::RefCell;
use core::fmt::Write as _;

use captester_core::report::Reporter;
use captester_core::session::{Delay, PulseOutput};
use embassy_stm32::gpio::Output;
use embassy_stm32::mode::Blocking;
use embassy_stm32::usart::UartTx;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, block_for};
use heapless::String;

/// Blocking UART writer shared between the harness loop and the edge
/// watcher. Each emission holds the lock for one write, so the watcher's
/// short markers interleave cleanly with the main loop's output.
pub type SharedUart = Mutex<CriticalSectionRawMutex, RefCell<UartTx<'static, Blocking>>>;

/// Capacitive plate drive output.
pub struct PlatePin {
    output: Output<'static>,
}

impl PlatePin {
    pub fn new(output: Output<'static>) -> Self {
        Self { output }
    }
}

impl PulseOutput for PlatePin {
    fn set_high(&mut self) {
        self.output.set_high();
    }

    fn set_low(&mut self) {
        self.output.set_low();
    }
}

/// Busy delay backing the harness' blocking holds.
#[derive(Copy, Clone, Default)]
pub struct BusyDelay;

impl Delay for BusyDelay {
    fn delay_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(u64::from(ms)));
    }
}

/// Cheap handle writing the observer stream to the shared UART.
#[derive(Copy, Clone)]
pub struct SerialReporter {
    uart: &'static SharedUart,
}

impl SerialReporter {
    pub fn new(uart: &'static SharedUart) -> Self {
        Self { uart }
    }

    fn write_bytes(&self, bytes: &[u8]) {
        self.uart.lock(|uart| {
            // the observer link is treated as always available; a failed
            // write is dropped rather than propagated
            let _ = uart.borrow_mut().blocking_write(bytes);
        });
    }
}

impl Reporter for SerialReporter {
    fn text(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    fn decimal(&mut self, value: u32) {
        let mut digits: String<10> = String::new();
        let _ = write!(digits, "{value}");
        self.write_bytes(digits.as_bytes());
    }

    fn newline(&mut self) {
        self.write_bytes(b"\r\n");
    }
}
