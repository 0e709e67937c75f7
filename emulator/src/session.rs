//! Host-side bench simulation.
//!
//! Runs the identical core engine against a fake sensor: the plate pin is a
//! shared level cell, holds become (capped) real sleeps, and sensor blinks
//! are injected either from the keyboard or from a scripted schedule. The
//! observer stream goes to stdout and, for scripted runs, into a transcript
//! file for evidence capture.

use std::fs::{self, File};
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use captester_core::config::{HarnessConfig, PulseRange};
use captester_core::flags::{EdgeMonitor, EdgeOutcome};
use captester_core::report::{self, Reporter};
use captester_core::rng::ArmingSeed;
use captester_core::session::{Delay, Harness, PulseOutput, SessionPhase};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;

/// Longest real sleep one hold may take. Bench plans wait up to a minute
/// between heartbeats; the simulation compresses anything longer than this.
const HOLD_CAP: Duration = Duration::from_millis(300);

/// Pacing between main-loop ticks, mirroring the firmware loop.
const TICK_PACING: Duration = Duration::from_millis(1);

/// Plan used by the interactive session: the bench shape, scaled down so a
/// human sees rounds progress without waiting out 25-second windows.
pub const INTERACTIVE_PLAN: HarnessConfig = HarnessConfig {
    repetitions: PulseRange::new(1, 6),
    on_time: PulseRange::new(50, 400),
    off_time: PulseRange::new(50, 400),
    jitter: PulseRange::new(10, 80),
    error_window: PulseRange::new(400, 1_200),
    settle_time_ms: 200,
    fixed_seed: None,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    /// Activation followed by several passing rounds.
    Clean,
    /// A blink lands inside a verification window and latches the session.
    Fault,
}

impl TranscriptProfile {
    pub const ALL: [Self; 2] = [Self::Clean, Self::Fault];

    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Clean => "transcripts/emulator-clean.log",
            TranscriptProfile::Fault => "transcripts/emulator-fault.log",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("clean") {
            Ok(Self::Clean)
        } else if tag.eq_ignore_ascii_case("fault") {
            Ok(Self::Fault)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }

    fn plan(self) -> HarnessConfig {
        match self {
            TranscriptProfile::Clean => HarnessConfig {
                repetitions: PulseRange::new(1, 4),
                on_time: PulseRange::new(20, 60),
                off_time: PulseRange::new(20, 60),
                jitter: PulseRange::new(3, 9),
                error_window: PulseRange::new(150, 300),
                settle_time_ms: 40,
                fixed_seed: Some(101),
            },
            TranscriptProfile::Fault => HarnessConfig {
                repetitions: PulseRange::new(2, 3),
                on_time: PulseRange::new(10, 11),
                off_time: PulseRange::new(10, 11),
                jitter: PulseRange::new(0, 0),
                error_window: PulseRange::new(200, 201),
                settle_time_ms: 40,
                fixed_seed: Some(7),
            },
        }
    }

    /// Wall-clock times (ms from start) at which the simulated sensor
    /// double-blinks. The first blink activates the session; for the fault
    /// profile the second lands inside round 1's verification window.
    fn blink_schedule(self) -> &'static [u64] {
        match self {
            TranscriptProfile::Clean => &[50],
            TranscriptProfile::Fault => &[30, 500],
        }
    }

    fn run_duration(self) -> Duration {
        match self {
            TranscriptProfile::Clean => Duration::from_millis(1_500),
            TranscriptProfile::Fault => Duration::from_millis(1_800),
        }
    }
}

/// Final state reported after a scripted run.
#[derive(Clone, Copy, Debug)]
pub struct ProfileSummary {
    pub rounds_announced: u32,
    pub latched: bool,
}

/// Shared stdout (plus optional transcript file) sink.
pub struct ConsoleSink {
    stdout: Stdout,
    transcript: Option<BufWriter<File>>,
}

impl ConsoleSink {
    fn new(transcript: Option<BufWriter<File>>) -> Self {
        Self {
            stdout: io::stdout(),
            transcript,
        }
    }

    fn emit(&mut self, bytes: &[u8]) {
        let _ = self.stdout.write_all(bytes);
        let _ = self.stdout.flush();
        if let Some(file) = self.transcript.as_mut() {
            let _ = file.write_all(bytes);
            let _ = file.flush();
        }
    }
}

/// Cheap handle the engine and the edge glue both write through.
#[derive(Clone)]
pub struct ConsoleReporter {
    sink: Arc<Mutex<ConsoleSink>>,
}

impl ConsoleReporter {
    fn new(sink: Arc<Mutex<ConsoleSink>>) -> Self {
        Self { sink }
    }

    fn emit(&self, bytes: &[u8]) {
        if let Ok(mut sink) = self.sink.lock() {
            sink.emit(bytes);
        }
    }
}

impl Reporter for ConsoleReporter {
    fn text(&mut self, s: &str) {
        self.emit(s.as_bytes());
    }

    fn decimal(&mut self, value: u32) {
        self.emit(value.to_string().as_bytes());
    }

    fn newline(&mut self) {
        self.emit(b"\r\n");
    }
}

/// Simulated capacitive plate; the level cell exists so a future status
/// display can show the drive state.
pub struct SimPlatePin {
    level: Arc<AtomicBool>,
}

impl PulseOutput for SimPlatePin {
    fn set_high(&mut self) {
        self.level.store(true, Ordering::Release);
    }

    fn set_low(&mut self) {
        self.level.store(false, Ordering::Release);
    }
}

/// Real sleeping with the long holds compressed.
pub struct PacedDelay;

impl Delay for PacedDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)).min(HOLD_CAP));
    }
}

/// Platform edge glue, identical in shape to the firmware sense watcher.
fn sense_edge(monitor: &EdgeMonitor, reporter: &mut ConsoleReporter, fixed_seed: Option<u16>) {
    match monitor.on_edge() {
        EdgeOutcome::PairPending => {}
        EdgeOutcome::Detected => report::announce_detection(reporter),
        EdgeOutcome::Activated { accumulated } => {
            let seed = ArmingSeed::derive(fixed_seed, accumulated);
            report::announce_activation(reporter, seed);
        }
    }
}

/// The sensor LED blinks twice per trigger.
fn blink(monitor: &EdgeMonitor, reporter: &mut ConsoleReporter, fixed_seed: Option<u16>) {
    sense_edge(monitor, reporter, fixed_seed);
    sense_edge(monitor, reporter, fixed_seed);
}

/// Harness driven by the simulated bench.
type SimHarness = Harness<'static, SimPlatePin, PacedDelay, ConsoleReporter>;

fn spawn_harness(
    plan: HarnessConfig,
    monitor: &'static EdgeMonitor,
    reporter: ConsoleReporter,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<ProfileSummary> {
    let pin = SimPlatePin {
        level: Arc::new(AtomicBool::new(false)),
    };
    let mut harness: SimHarness =
        Harness::new(plan, monitor, pin, PacedDelay, reporter).expect("emulation plan rejected");

    thread::spawn(move || {
        harness.initialize();
        while !stop.load(Ordering::Acquire) {
            harness.tick();
            thread::sleep(TICK_PACING);
        }
        ProfileSummary {
            rounds_announced: harness.round_index(),
            latched: harness.phase() == SessionPhase::LatchedError,
        }
    })
}

/// Runs one scripted profile to completion and writes its transcript.
pub fn run_scripted(profile: TranscriptProfile) -> io::Result<ProfileSummary> {
    let path = Path::new(profile.log_path());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let transcript = BufWriter::new(File::create(path)?);

    let sink = Arc::new(Mutex::new(ConsoleSink::new(Some(transcript))));
    let reporter = ConsoleReporter::new(Arc::clone(&sink));
    let monitor: &'static EdgeMonitor = Box::leak(Box::new(EdgeMonitor::new()));
    let stop = Arc::new(AtomicBool::new(false));

    let plan = profile.plan();
    let harness = spawn_harness(plan, monitor, reporter.clone(), Arc::clone(&stop));

    let started = Instant::now();
    let mut injector = reporter.clone();
    for &at_ms in profile.blink_schedule() {
        let at = Duration::from_millis(at_ms);
        if let Some(remaining) = at.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
        blink(monitor, &mut injector, plan.fixed_seed);
    }

    if let Some(remaining) = profile.run_duration().checked_sub(started.elapsed()) {
        thread::sleep(remaining);
    }
    stop.store(true, Ordering::Release);

    let summary = harness.join().expect("harness thread panicked");
    Ok(summary)
}

/// Interactive session: `b` double-blinks the sensor, `q` quits.
pub fn run_interactive() -> io::Result<()> {
    let sink = Arc::new(Mutex::new(ConsoleSink::new(None)));
    let reporter = ConsoleReporter::new(Arc::clone(&sink));
    let monitor: &'static EdgeMonitor = Box::leak(Box::new(EdgeMonitor::new()));
    let stop = Arc::new(AtomicBool::new(false));

    println!("Captester emulator: press `b` to wave at the sensor, `q` to quit.");
    let harness = spawn_harness(
        INTERACTIVE_PLAN,
        monitor,
        reporter.clone(),
        Arc::clone(&stop),
    );

    terminal::enable_raw_mode()?;
    let mut injector = reporter;
    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('b') if key.kind == KeyEventKind::Press => {
                        blink(monitor, &mut injector, INTERACTIVE_PLAN.fixed_seed);
                    }
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    _ => {}
                }
            }
        }
    }
    terminal::disable_raw_mode()?;

    stop.store(true, Ordering::Release);
    let summary = harness.join().expect("harness thread panicked");
    println!(
        "\nSession closed after {} announced round(s){}.",
        summary.rounds_announced,
        if summary.latched { ", latched on a fault" } else { "" }
    );
    Ok(())
}
