//! The round-based toggle/verify state machine.
//!
//! One `tick` performs one main-loop step: a single pulse pair, one
//! verification pass, or one latched heartbeat. All waiting happens through
//! the injected [`Delay`], so the machine runs identically under firmware
//! busy-delays, the host emulator's scaled sleeps, and the tests' virtual
//! clock. The sense-edge handler never touches the machine directly; it
//! only writes the [`EdgeMonitor`] flags the tick reads back.

use rand_wyrand::WyRand;

use crate::config::{ConfigError, HarnessConfig, LATCH_HEARTBEAT_PAUSE_MS, MAX_REPETITIONS};
use crate::flags::EdgeMonitor;
use crate::log::PulseLog;
use crate::params::RoundParameters;
use crate::report::{self, Marker, Reporter};
use crate::rng::{ArmingSeed, draw_below};

/// Drives the capacitive plate output.
pub trait PulseOutput {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Abstract blocking sleep. Holds are not cancellable; a latched session is
/// exited only by restarting the device.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Lifecycle of one powered session.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SessionPhase {
    /// Constructed but not yet announced to the observer.
    Uninitialized,
    /// Waiting for the double-blink gesture.
    AwaitingActivation,
    /// Gesture seen; the next tick seeds the generator.
    Armed,
    /// Issuing pulse pairs, counting `remaining` down to zero.
    Sequencing { remaining: u32 },
    /// Settle delay plus error window, then a single flag inspection.
    Verifying,
    /// Terminal. Only a device restart leaves this phase.
    LatchedError,
}

impl SessionPhase {
    #[must_use]
    pub const fn is_latched(self) -> bool {
        matches!(self, SessionPhase::LatchedError)
    }
}

/// The harness proper: owns the plate pin, the delay source, the reporter
/// sink, and every piece of session state except the edge-handler flags.
pub struct Harness<'m, P, D, R, const CAP: usize = MAX_REPETITIONS> {
    config: HarnessConfig,
    monitor: &'m EdgeMonitor,
    pin: P,
    delay: D,
    reporter: R,
    phase: SessionPhase,
    round_index: u32,
    params: RoundParameters,
    log: PulseLog<CAP>,
    generator: Option<WyRand>,
}

impl<'m, P, D, R, const CAP: usize> Harness<'m, P, D, R, CAP>
where
    P: PulseOutput,
    D: Delay,
    R: Reporter,
{
    /// Builds an uninitialized harness after checking the plan against the
    /// log capacity.
    pub fn new(
        config: HarnessConfig,
        monitor: &'m EdgeMonitor,
        pin: P,
        delay: D,
        reporter: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.repetitions.max as usize > CAP {
            return Err(ConfigError::RepetitionCapacity {
                requested: config.repetitions.max,
                capacity: CAP,
            });
        }

        Ok(Self {
            config,
            monitor,
            pin,
            delay,
            reporter,
            phase: SessionPhase::Uninitialized,
            round_index: 0,
            params: RoundParameters::ZERO,
            log: PulseLog::new(),
            generator: None,
        })
    }

    /// Announces the restart, drives the plate to its known-low idle state,
    /// and begins waiting for the activation gesture. The platform must arm
    /// the edge source before calling this.
    pub fn initialize(&mut self) {
        report::announce_initialized(&mut self.reporter);
        self.pin.set_low();
        self.phase = SessionPhase::AwaitingActivation;
    }

    /// One main-loop step.
    pub fn tick(&mut self) {
        match self.phase {
            SessionPhase::Uninitialized => {}
            SessionPhase::AwaitingActivation => {
                if self.monitor.is_armed() {
                    self.phase = SessionPhase::Armed;
                }
            }
            SessionPhase::Armed => self.arm_generator(),
            SessionPhase::Sequencing { remaining: 0 } => {
                self.phase = SessionPhase::Verifying;
            }
            SessionPhase::Sequencing { remaining } => self.run_pulse_pair(remaining),
            SessionPhase::Verifying => self.run_verification(),
            SessionPhase::LatchedError => self.heartbeat(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn round_index(&self) -> u32 {
        self.round_index
    }

    #[must_use]
    pub fn params(&self) -> &RoundParameters {
        &self.params
    }

    #[must_use]
    pub fn log(&self) -> &PulseLog<CAP> {
        &self.log
    }

    /// Seeds the generator from the seed captured at the activation edge.
    /// The extra tick spent here lets the activation banner flush before
    /// the first hold begins; the empty first sequence then realizes the
    /// initial error check.
    fn arm_generator(&mut self) {
        let seed = ArmingSeed::derive(self.config.fixed_seed, self.monitor.accumulated());
        self.generator = Some(seed.into_generator());
        self.phase = SessionPhase::Sequencing { remaining: 0 };
    }

    fn run_pulse_pair(&mut self, remaining: u32) {
        self.reporter.marker(Marker::Ping);

        self.pin.set_high();
        let held_on = self.hold_jittered(self.params.on_duration_ms);
        let recorded = self.log.record_on(remaining, held_on);
        debug_assert!(recorded, "pulse log slot out of range");

        self.pin.set_low();
        let held_off = self.hold_jittered(self.params.off_duration_ms);
        let recorded = self.log.record_off(remaining, held_off);
        debug_assert!(recorded, "pulse log slot out of range");

        let remaining = remaining - 1;
        if remaining == 0 {
            self.reporter.text("  CHECKING FOR ERRORS... ");
            self.phase = SessionPhase::Verifying;
        } else {
            self.phase = SessionPhase::Sequencing { remaining };
        }
    }

    /// Holds the current pin level for the jittered duration and returns
    /// exactly the milliseconds held. Holds never drop below one
    /// millisecond; the clamped value is what gets logged.
    fn hold_jittered(&mut self, base_ms: u32) -> u32 {
        let target = i64::from(base_ms) + self.draw_jitter();
        let held = u32::try_from(target).map_or(1, |ms| ms.max(1));
        self.delay.delay_ms(held);
        held
    }

    /// Signed offset in `[-magnitude/2, magnitude/2)`. A zero magnitude
    /// consumes no draw at all.
    fn draw_jitter(&mut self) -> i64 {
        let magnitude = self.params.jitter_magnitude_ms;
        if magnitude == 0 {
            return 0;
        }
        let Some(generator) = self.generator.as_mut() else {
            return 0;
        };
        i64::from(draw_below(generator, magnitude)) - i64::from(magnitude / 2)
    }

    fn run_verification(&mut self) {
        self.delay.delay_ms(self.config.settle_time_ms);
        self.monitor.clear_unexpected();
        self.delay.delay_ms(self.params.inter_round_delay_ms);

        if self.monitor.take_unexpected() {
            self.fail_round();
        } else {
            self.pass_round();
        }
    }

    fn pass_round(&mut self) {
        self.reporter.text("NO ERRORS FOUND.");
        self.log.clear_all();

        let previous_jitter = self.params.jitter_magnitude_ms;
        let Some(generator) = self.generator.as_mut() else {
            // generator is seeded before the first verification can run
            return;
        };
        self.params = RoundParameters::draw(generator, &self.config, previous_jitter);
        self.params
            .announce(self.round_index, self.config.settle_time_ms, &mut self.reporter);
        self.round_index += 1;
        self.phase = SessionPhase::Sequencing {
            remaining: self.params.repetition_count,
        };
    }

    /// Latches the session and replays the round's recorded holds, first
    /// issued first, so the operator can reproduce the failing stimulus.
    fn fail_round(&mut self) {
        let repetition_count = self.params.repetition_count;

        self.reporter.text(" FAULT DETECTED IN PREVIOUS ROUND.");
        self.reporter.newline();
        self.reporter.text("On-time holds: ");
        for held in self.log.replay_on(repetition_count) {
            self.reporter.decimal(held);
            self.reporter.text(" ");
        }
        self.reporter.newline();
        self.reporter.text("Off-time holds: ");
        for held in self.log.replay_off(repetition_count) {
            self.reporter.decimal(held);
            self.reporter.text(" ");
        }
        self.reporter.newline();
        self.reporter.marker(Marker::ErrorSentinel);

        self.phase = SessionPhase::LatchedError;
    }

    fn heartbeat(&mut self) {
        self.delay.delay_ms(LATCH_HEARTBEAT_PAUSE_MS);
        self.reporter.newline();
        self.reporter.text("Error...");
        self.reporter.newline();
        self.reporter.marker(Marker::ErrorSentinel);
    }
}
