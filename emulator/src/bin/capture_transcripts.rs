use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::TranscriptProfile;

fn main() -> io::Result<()> {
    for profile in TranscriptProfile::ALL {
        let summary = session::run_scripted(profile)?;
        eprintln!(
            "{}: {} round(s){}",
            profile.log_path(),
            summary.rounds_announced,
            if summary.latched { ", latched" } else { "" }
        );
    }
    Ok(())
}
