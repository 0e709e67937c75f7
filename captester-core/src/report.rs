//! Wire tokens and the one-way observer sink.
//!
//! The remote observer slices the serial stream on single-character tokens,
//! so their encodings are load-bearing and must never change. Everything
//! else written through the sink is free-form commentary for humans reading
//! the captured log.

use crate::rng::{ArmingSeed, SeedSource};

/// Tokens consumed by the remote observer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Marker {
    /// Device (re)initialized; any prior recording is discarded.
    Restarted,
    /// First activation recognized; recording begins.
    Recording,
    /// A capacitive ping was just issued.
    Ping,
    /// A detection edge was observed.
    Detect,
    /// Start of a round's parameter announcement.
    RoundHeader,
    /// Error sentinel, emitted once on latch and on every heartbeat after.
    ErrorSentinel,
}

impl Marker {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Marker::Restarted => "*",
            Marker::Recording => "$",
            Marker::Ping => ",",
            Marker::Detect => "#",
            Marker::RoundHeader => "&",
            Marker::ErrorSentinel => "^",
        }
    }
}

/// Append-only text sink feeding the remote observer.
///
/// The transport is treated as always available; implementations drop rather
/// than propagate write failures.
pub trait Reporter {
    fn text(&mut self, s: &str);
    fn decimal(&mut self, value: u32);
    fn newline(&mut self);

    fn marker(&mut self, marker: Marker) {
        self.text(marker.as_str());
    }
}

/// Restart banner, emitted once from initialization.
pub fn announce_initialized(reporter: &mut impl Reporter) {
    reporter.marker(Marker::Restarted);
    reporter.newline();
    reporter.text("Capacitive tester initialized. Press the reset button to restart testing.");
    reporter.newline();
    reporter.text("Wave a hand over the sensor to begin.");
    reporter.newline();
}

/// Activation banner. Runs in the edge handler's context, so it stays short
/// and fixed.
pub fn announce_activation(reporter: &mut impl Reporter, seed: ArmingSeed) {
    reporter.marker(Marker::Recording);
    reporter.newline();
    reporter.text("Session armed. ");
    match seed.source {
        SeedSource::Fixed => reporter.text("Preconfigured seed: "),
        SeedSource::Accumulated => reporter.text("Derived seed: "),
    }
    reporter.decimal(u32::from(seed.value));
    reporter.newline();
    reporter.text("A ");
    reporter.marker(Marker::Ping);
    reporter.text(" marks a capacitive ping sent to the device.");
    reporter.newline();
    reporter.text("A ");
    reporter.marker(Marker::Detect);
    reporter.text(" marks a blink response observed from the device.");
    reporter.newline();
    reporter.text("Running the initial error check... ");
}

/// Detection marker emitted for every completed blink pair while armed.
pub fn announce_detection(reporter: &mut impl Reporter) {
    reporter.marker(Marker::Detect);
}
