//! # cuekit
//!
//! Headless front end for the caption engine: edit a WebVTT track in place,
//! export a session of drafts, preview playback against a wall clock and
//! inspect how a video URL would be embedded.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cuekit_lib::core::settings::{AppSettings, SettingsManager};

/// Caption timeline editor and WebVTT exporter
#[derive(Parser, Debug)]
#[command(name = "cuekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings directory (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export a JSON session of caption drafts as WebVTT
    Export {
        session: PathBuf,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a WebVTT file
    Check { file: PathBuf },
    /// List the cues in a WebVTT file
    List {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show the caption active at a playback time
    At { file: PathBuf, seconds: f64 },
    /// Add a caption to a WebVTT file
    Add {
        file: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Replace a caption, keeping any field not given
    Edit {
        file: PathBuf,
        /// 1-based cue number as shown by `list`
        cue: usize,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Remove a caption
    Delete { file: PathBuf, cue: usize },
    /// Preview captions in real time
    Play {
        file: PathBuf,
        /// Playback position to start from, in seconds
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Playback rate
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
        /// Stop after this many seconds of wall time (default: end of track)
        #[arg(long)]
        duration: Option<f64>,
    },
    /// Show how a video URL would be played
    Source { url: String },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<PathBuf>) -> AppSettings {
    match config.or_else(SettingsManager::default_dir) {
        Some(dir) => SettingsManager::new(dir).load(),
        None => AppSettings::default(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(cli.config);
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Export { session, output } => {
            commands::export(&session, output.as_deref(), &mut out)
        }
        Commands::Check { file } => commands::check(&file, &mut out),
        Commands::List { file, json } => commands::list(&file, json, &mut out),
        Commands::At { file, seconds } => commands::at(&file, seconds, &settings, &mut out),
        Commands::Add {
            file,
            text,
            start,
            end,
        } => commands::add(&file, &text, &start, &end, &mut out),
        Commands::Edit {
            file,
            cue,
            text,
            start,
            end,
        } => commands::edit(
            &file,
            cue,
            commands::EditFields { text, start, end },
            &mut out,
        ),
        Commands::Delete { file, cue } => commands::delete(&file, cue, &mut out),
        Commands::Play {
            file,
            from,
            rate,
            duration,
        } => commands::play(&file, from, rate, duration, &settings, &mut out).await,
        Commands::Source { url } => commands::source(&url, &settings, &mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_with_partial_fields() {
        let cli = Cli::try_parse_from(["cuekit", "edit", "a.vtt", "2", "--text", "hi"]).unwrap();
        match cli.command {
            Commands::Edit {
                cue, text, start, ..
            } => {
                assert_eq!(cue, 2);
                assert_eq!(text.as_deref(), Some("hi"));
                assert!(start.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["cuekit", "check", "a.vtt", "-vv", "--config", "/tmp/c"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c")));
    }

    #[test]
    fn test_add_requires_times() {
        assert!(Cli::try_parse_from(["cuekit", "add", "a.vtt", "--text", "hi"]).is_err());
    }

    #[test]
    fn test_play_defaults() {
        let cli = Cli::try_parse_from(["cuekit", "play", "a.vtt"]).unwrap();
        match cli.command {
            Commands::Play {
                from,
                rate,
                duration,
                ..
            } => {
                assert_eq!(from, 0.0);
                assert_eq!(rate, 1.0);
                assert!(duration.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
