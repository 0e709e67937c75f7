use captester_core::flags::{EdgeMonitor, EdgeOutcome};
use captester_core::report;
use captester_core::rng::ArmingSeed;
use embassy_stm32::exti::ExtiInput;

use crate::hw::SerialReporter;

/// Edge watcher for the wall-sensor LED. Runs on the high-priority
/// executor so a blink lands even while the harness is mid-hold; the work
/// per edge is a flag update plus a short fixed emission.
#[embassy_executor::task]
pub async fn run(
    mut sense: ExtiInput<'static>,
    monitor: &'static EdgeMonitor,
    mut reporter: SerialReporter,
    fixed_seed: Option<u16>,
) -> ! {
    loop {
        sense.wait_for_rising_edge().await;
        match monitor.on_edge() {
            EdgeOutcome::PairPending => {}
            EdgeOutcome::Detected => {
                report::announce_detection(&mut reporter);
                defmt::warn!("unexpected detection edge");
            }
            EdgeOutcome::Activated { accumulated } => {
                let seed = ArmingSeed::derive(fixed_seed, accumulated);
                report::announce_activation(&mut reporter, seed);
                defmt::info!("session armed, seed={=u16}", seed.value);
            }
        }
    }
}
