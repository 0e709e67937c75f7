use core::cell::RefCell;

use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::usart::{self, UartTx};
use embassy_sync::blocking_mutex::Mutex;
use static_cell::StaticCell;

use captester_core::config::HarnessConfig;
use captester_core::flags::EdgeMonitor;
use captester_core::session::Harness;

use crate::hw::{BusyDelay, PlatePin, SerialReporter, SharedUart};

mod harness_task;
mod sense_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        cortex_m::interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                cortex_m::interrupt::enable();
            }
        }
    }
}

/// The bench test plan. Edit here to change what gets exercised.
const PLAN: HarnessConfig = HarnessConfig::DEFAULT;

static EDGE_MONITOR: EdgeMonitor = EdgeMonitor::new();
static UART: StaticCell<SharedUart> = StaticCell::new();
static SENSE_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

// The sense watcher borrows USART1's vector; the peripheral itself is
// unused. Running it above the thread-mode executor lets edge handling
// preempt the harness' blocking holds.
#[interrupt]
unsafe fn USART1() {
    unsafe {
        SENSE_EXECUTOR.on_interrupt();
    }
}

fn uart_config() -> usart::Config {
    let mut config = usart::Config::default();
    config.baudrate = 115_200;
    config
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let p = hal::init(config);

    let tx = UartTx::new_blocking(p.USART2, p.PA2, uart_config()).expect("observer uart config");
    let uart: &'static SharedUart = UART.init(Mutex::new(RefCell::new(tx)));
    let reporter = SerialReporter::new(uart);

    let plate = PlatePin::new(Output::new(p.PA4, Level::Low, Speed::Low));
    let sense = ExtiInput::new(p.PA0, p.EXTI0, Pull::Up);

    let mut harness = Harness::new(PLAN, &EDGE_MONITOR, plate, BusyDelay, reporter)
        .expect("bench plan rejected");

    interrupt::USART1.set_priority(Priority::P1);
    let sense_spawner = SENSE_EXECUTOR.start(interrupt::USART1);
    sense_spawner
        .spawn(sense_task::run(
            sense,
            &EDGE_MONITOR,
            reporter,
            PLAN.fixed_seed,
        ))
        .expect("failed to spawn sense watcher");

    harness.initialize();
    defmt::info!("captester initialized; awaiting activation gesture");

    spawner
        .spawn(harness_task::run(harness))
        .expect("failed to spawn harness loop");

    core::future::pending::<()>().await;
}
