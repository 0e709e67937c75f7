//! Per-round randomized parameters.

use rand_core::RngCore;

use crate::config::HarnessConfig;
use crate::report::{Marker, Reporter};
use crate::rng::draw_in;

/// The five quantities fixed for the duration of one round. Jitter is
/// applied per pulse on top of the fixed base holds; everything else is
/// drawn once here and reused by every pulse in the round.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RoundParameters {
    pub repetition_count: u32,
    pub on_duration_ms: u32,
    pub off_duration_ms: u32,
    pub inter_round_delay_ms: u32,
    pub jitter_magnitude_ms: u32,
}

impl RoundParameters {
    /// Pre-activation placeholder. The first verification pass runs with an
    /// empty sequence and a zero-length window.
    pub const ZERO: Self = Self {
        repetition_count: 0,
        on_duration_ms: 0,
        off_duration_ms: 0,
        inter_round_delay_ms: 0,
        jitter_magnitude_ms: 0,
    };

    /// Draws a fresh parameter set for the next round. A disabled jitter
    /// range skips its draw entirely and carries the previous magnitude
    /// forward.
    #[must_use]
    pub fn draw(rng: &mut impl RngCore, config: &HarnessConfig, previous_jitter_ms: u32) -> Self {
        let repetition_count = draw_in(rng, config.repetitions);
        let on_duration_ms = draw_in(rng, config.on_time);
        let off_duration_ms = draw_in(rng, config.off_time);
        let inter_round_delay_ms = draw_in(rng, config.error_window);
        let jitter_magnitude_ms = if config.jitter.is_disabled() {
            previous_jitter_ms
        } else {
            draw_in(rng, config.jitter)
        };

        Self {
            repetition_count,
            on_duration_ms,
            off_duration_ms,
            inter_round_delay_ms,
            jitter_magnitude_ms,
        }
    }

    /// Emits the round header before any pulse is issued, so a crash
    /// mid-round still leaves a legible trail. The displayed delay includes
    /// the settle time, matching what the observer measures between rounds.
    pub fn announce(&self, round_index: u32, settle_time_ms: u32, reporter: &mut impl Reporter) {
        reporter.newline();
        reporter.marker(Marker::RoundHeader);
        reporter.text("  ROUND: ");
        reporter.decimal(round_index);
        reporter.text("  REPETITION: ");
        reporter.decimal(self.repetition_count);
        reporter.text("  ON: ");
        reporter.decimal(self.on_duration_ms);
        reporter.text("  OFF: ");
        reporter.decimal(self.off_duration_ms);
        reporter.text("  DELAY: ");
        reporter.decimal(self.inter_round_delay_ms.saturating_add(settle_time_ms));
        reporter.text("  JITTER: ");
        reporter.decimal(self.jitter_magnitude_ms);
        reporter.newline();
    }
}
