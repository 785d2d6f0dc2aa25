use anyhow::{Context, Result};
use clap::Parser;
use hoodtrack::settings::TrackerSettings;
use hoodtrack::text_format;
use hoodtrack::tracker::Tracker;
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    /// Region/exit/location data (JSON)
    #[arg(long, default_value = "data/world.json")]
    world: PathBuf,

    /// Entrance shuffle table (JSON)
    #[arg(long, default_value = "data/shuffle_table.json")]
    table: PathBuf,

    /// Session file, read and rewritten in place
    session: PathBuf,
}

// Settings travel inside the session file, so they have to be pulled out
// before the tracker can be built.
fn read_settings(session_text: &str) -> Result<TrackerSettings> {
    let data = text_format::read_sections(session_text)?;
    match data.get("settings").and_then(|lines| lines.first()) {
        Some(line) => serde_json::from_str(line).context("unable to parse settings"),
        None => Ok(TrackerSettings::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let world_str = std::fs::read_to_string(&args.world)
        .with_context(|| format!("unable to read {}", args.world.display()))?;
    let table_str = std::fs::read_to_string(&args.table)
        .with_context(|| format!("unable to read {}", args.table.display()))?;

    let session_text = match std::fs::read_to_string(&args.session) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{} not found, starting a new session", args.session.display());
            String::new()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("unable to read {}", args.session.display()))
        }
    };

    let settings = read_settings(&session_text)?;
    let mut tracker = Tracker::from_strs(&world_str, &table_str, settings)?;
    if !session_text.is_empty() {
        tracker.load_session(&session_text)?;
    }

    info!(
        "Solve finished in {} passes, {} locations possible",
        tracker.result.passes,
        tracker.result.possible_locations.len()
    );
    std::fs::write(&args.session, tracker.save())
        .with_context(|| format!("unable to write {}", args.session.display()))?;
    Ok(())
}
