mod session;

use std::env;
use std::io;
use std::process;

use session::TranscriptProfile;

fn main() -> io::Result<()> {
    match parse_mode() {
        Ok(Mode::Interactive) => session::run_interactive(),
        Ok(Mode::Scripted(profile)) => {
            let summary = session::run_scripted(profile)?;
            eprintln!(
                "\nTranscript written to {} ({} round(s){})",
                profile.log_path(),
                summary.rounds_announced,
                if summary.latched { ", latched" } else { "" }
            );
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            eprintln!("Usage: captester-emulator [--profile <clean|fault>]");
            process::exit(2);
        }
    }
}

enum Mode {
    Interactive,
    Scripted(TranscriptProfile),
}

fn parse_mode() -> Result<Mode, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(Mode::Interactive);
    };

    if let Some(value) = arg.strip_prefix("--profile=") {
        TranscriptProfile::from_tag(value).map(Mode::Scripted)
    } else if arg == "--profile" {
        match args.next() {
            Some(value) => TranscriptProfile::from_tag(&value).map(Mode::Scripted),
            None => Err("Expected value after --profile".to_string()),
        }
    } else {
        TranscriptProfile::from_tag(&arg).map(Mode::Scripted)
    }
}
