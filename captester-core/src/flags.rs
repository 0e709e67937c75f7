//! Flag cells shared between the sense-edge handler and the main loop.
//!
//! The handler runs asynchronously and only ever writes through this
//! monitor; the main loop reads through it, and the sole read-modify
//! handshake (`take_unexpected`) is a single atomic swap, so no detection
//! can fall into the gap between clearing the flag and opening the window.

use portable_atomic::{AtomicBool, AtomicU16, Ordering};

/// What one sense edge amounted to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdgeOutcome {
    /// First blink of a pair; nothing to act on yet.
    PairPending,
    /// Pair completed while unarmed: the session arms now, with the
    /// accumulator value captured at this edge.
    Activated { accumulated: u16 },
    /// Pair completed while armed: an unexpected detection.
    Detected,
}

/// Atomic state written by the edge handler.
///
/// The sensor blinks twice per trigger, so only every second edge carries
/// meaning; the parity bit pairs them up.
pub struct EdgeMonitor {
    toggle_parity: AtomicBool,
    unexpected_detection: AtomicBool,
    armed: AtomicBool,
    seed_accumulator: AtomicU16,
}

impl EdgeMonitor {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            toggle_parity: AtomicBool::new(false),
            unexpected_detection: AtomicBool::new(false),
            armed: AtomicBool::new(false),
            seed_accumulator: AtomicU16::new(0),
        }
    }

    /// Handler entry point, invoked on every sense edge. Must stay
    /// non-blocking and allocation-free; it preempts the main loop's
    /// timing-sensitive holds.
    pub fn on_edge(&self) -> EdgeOutcome {
        let pair_complete = self.toggle_parity.fetch_xor(true, Ordering::AcqRel);
        if !pair_complete {
            if !self.armed.load(Ordering::Acquire) {
                self.seed_accumulator.fetch_add(1, Ordering::AcqRel);
            }
            return EdgeOutcome::PairPending;
        }

        if self.armed.load(Ordering::Acquire) {
            self.unexpected_detection.store(true, Ordering::Release);
            EdgeOutcome::Detected
        } else {
            self.armed.store(true, Ordering::Release);
            EdgeOutcome::Activated {
                accumulated: self.seed_accumulator.load(Ordering::Acquire),
            }
        }
    }

    /// Returns `true` once the activation gesture has completed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Current value of the pre-activation entropy counter.
    #[must_use]
    pub fn accumulated(&self) -> u16 {
        self.seed_accumulator.load(Ordering::Acquire)
    }

    /// Resets the sticky detection flag at the start of a verification
    /// window.
    pub fn clear_unexpected(&self) {
        self.unexpected_detection.store(false, Ordering::Release);
    }

    /// Test-and-reset handshake: reports whether a detection occurred since
    /// the last clear, clearing the flag in the same atomic step.
    pub fn take_unexpected(&self) -> bool {
        self.unexpected_detection.swap(false, Ordering::AcqRel)
    }
}

impl Default for EdgeMonitor {
    fn default() -> Self {
        Self::new()
    }
}
