//! Seed derivation and uniform parameter draws.
//!
//! The session generator is seeded exactly once, at the transition from
//! awaiting activation to armed. Entropy comes from the activation
//! accumulator (how many half-gestures the edge handler saw before the user
//! armed the session) unless the plan pins a fixed seed for reproduction
//! runs.

use rand_core::{RngCore, SeedableRng};
use rand_wyrand::WyRand;

use crate::config::PulseRange;

/// Where the session seed came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeedSource {
    Fixed,
    Accumulated,
}

/// The 16-bit seed chosen at the arming transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ArmingSeed {
    pub value: u16,
    pub source: SeedSource,
}

impl ArmingSeed {
    /// Prefers the configured override; otherwise the edge accumulator
    /// captured at the activation edge.
    #[must_use]
    pub const fn derive(fixed: Option<u16>, accumulated: u16) -> Self {
        match fixed {
            Some(value) => Self {
                value,
                source: SeedSource::Fixed,
            },
            None => Self {
                value: accumulated,
                source: SeedSource::Accumulated,
            },
        }
    }

    /// Instantiates the session generator.
    #[must_use]
    pub fn into_generator(self) -> WyRand {
        WyRand::seed_from_u64(u64::from(self.value))
    }
}

/// Uniform draw over `[0, bound)`. `bound` must be non-zero.
pub fn draw_below(rng: &mut impl RngCore, bound: u32) -> u32 {
    debug_assert!(bound > 0, "draw over an empty interval");
    rng.next_u32() % bound
}

/// Uniform draw over the half-open range.
pub fn draw_in(rng: &mut impl RngCore, range: PulseRange) -> u32 {
    range.min + draw_below(rng, range.span())
}
