//! Test-plan configuration shared by firmware and host targets.
//!
//! Every tunable is an integer bound in milliseconds (or a count), grouped
//! into half-open ranges the round generator draws from. The defaults
//! reproduce the bench plan the harness has always shipped with.

use core::fmt;

/// Capacity of the pulse log, and therefore the ceiling for the repetition
/// range's upper bound.
pub const MAX_REPETITIONS: usize = 30;

/// Pause between latched-error heartbeats.
pub const LATCH_HEARTBEAT_PAUSE_MS: u32 = 60_000;

/// Half-open integer range `[min, max)` a round parameter is drawn from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PulseRange {
    pub min: u32,
    pub max: u32,
}

impl PulseRange {
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Number of drawable values; zero when the range is empty.
    #[must_use]
    pub const fn span(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }

    /// A zero upper bound turns the parameter off instead of describing a
    /// range. Only the jitter range uses this.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.max == 0
    }

    /// Returns `true` when `value` could have been drawn from this range.
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value < self.max
    }
}

/// Complete description of one test plan.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HarnessConfig {
    /// Pulse pairs issued per round.
    pub repetitions: PulseRange,
    /// High-phase hold per pulse, before jitter.
    pub on_time: PulseRange,
    /// Low-phase hold per pulse, before jitter.
    pub off_time: PulseRange,
    /// Magnitude bound for the signed per-pulse offset. A `[0, 0)` range
    /// disables jitter entirely.
    pub jitter: PulseRange,
    /// Error-detection window, doubling as the gap before the next round.
    pub error_window: PulseRange,
    /// Settle delay between the last pulse and the window opening.
    pub settle_time_ms: u32,
    /// Optional seed override; `None` derives the seed from the activation
    /// accumulator.
    pub fixed_seed: Option<u16>,
}

impl HarnessConfig {
    /// The bench plan.
    pub const DEFAULT: Self = Self {
        repetitions: PulseRange::new(1, 30),
        on_time: PulseRange::new(10, 5_000),
        off_time: PulseRange::new(10, 5_000),
        jitter: PulseRange::new(1, 500),
        error_window: PulseRange::new(2_500, 25_000),
        settle_time_ms: 1_000,
        fixed_seed: None,
    };

    /// Checks the plan against the generator's assumptions. Holds below one
    /// millisecond cannot be sequenced, and empty ranges cannot be drawn
    /// from (except the jitter range, where `[0, 0)` means "off").
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repetitions.span() == 0 {
            return Err(ConfigError::EmptyRange("repetitions"));
        }
        if self.on_time.span() == 0 {
            return Err(ConfigError::EmptyRange("on_time"));
        }
        if self.off_time.span() == 0 {
            return Err(ConfigError::EmptyRange("off_time"));
        }
        if self.error_window.span() == 0 {
            return Err(ConfigError::EmptyRange("error_window"));
        }
        if !self.jitter.is_disabled() && self.jitter.span() == 0 {
            return Err(ConfigError::EmptyRange("jitter"));
        }
        if self.repetitions.min == 0 {
            return Err(ConfigError::ZeroMinimum("repetitions"));
        }
        if self.on_time.min == 0 {
            return Err(ConfigError::ZeroMinimum("on_time"));
        }
        if self.off_time.min == 0 {
            return Err(ConfigError::ZeroMinimum("off_time"));
        }
        Ok(())
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reasons a test plan is rejected before any testing begins.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The named range has no drawable value.
    EmptyRange(&'static str),
    /// The named range permits a zero count or hold.
    ZeroMinimum(&'static str),
    /// The repetition bound exceeds the pulse log capacity.
    RepetitionCapacity { requested: u32, capacity: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyRange(field) => write!(f, "range `{field}` is empty"),
            ConfigError::ZeroMinimum(field) => write!(f, "range `{field}` permits zero"),
            ConfigError::RepetitionCapacity {
                requested,
                capacity,
            } => write!(
                f,
                "repetition bound {requested} exceeds log capacity {capacity}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_valid() {
        assert_eq!(HarnessConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn disabled_jitter_range_is_valid() {
        let mut config = HarnessConfig::DEFAULT;
        config.jitter = PulseRange::new(0, 0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn empty_window_range_is_rejected() {
        let mut config = HarnessConfig::DEFAULT;
        config.error_window = PulseRange::new(500, 500);
        assert_eq!(config.validate(), Err(ConfigError::EmptyRange("error_window")));
    }

    #[test]
    fn zero_minimum_hold_is_rejected() {
        let mut config = HarnessConfig::DEFAULT;
        config.on_time = PulseRange::new(0, 100);
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinimum("on_time")));
    }

    #[test]
    fn range_span_and_membership() {
        let range = PulseRange::new(10, 14);
        assert_eq!(range.span(), 4);
        assert!(range.contains(10));
        assert!(range.contains(13));
        assert!(!range.contains(14));
        assert!(!range.contains(9));
    }
}
