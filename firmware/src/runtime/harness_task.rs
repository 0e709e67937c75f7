use captester_core::session::Harness;
use embassy_time::Timer;

use crate::hw::{BusyDelay, PlatePin, SerialReporter};

/// Harness driven by the bench peripherals.
pub type BenchHarness = Harness<'static, PlatePin, BusyDelay, SerialReporter>;

/// Main loop: one state-machine step per tick. Holds and verification
/// windows block inside `tick`; the pacing delay only matters while the
/// session idles awaiting activation.
#[embassy_executor::task]
pub async fn run(mut harness: BenchHarness) -> ! {
    let mut latch_logged = false;
    loop {
        harness.tick();
        if harness.phase().is_latched() && !latch_logged {
            defmt::error!(
                "fault latched after round {}; reset the board to resume",
                harness.round_index()
            );
            latch_logged = true;
        }
        Timer::after_millis(1).await;
    }
}
