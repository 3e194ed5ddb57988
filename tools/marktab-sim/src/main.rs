//! Event replay harness for the MarkTab background.
//!
//! Runs the background against a simulated browser so bookmark handling can
//! be exercised without a real host.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a script and print the outcome report
//! marktab-sim run tools/marktab-sim/demos/bookmark.json
//!
//! # Same, with preferences read from a file
//! marktab-sim run demos/bookmark.json --prefs prefs.json
//!
//! # Flip a toggle the way the options page does
//! marktab-sim prefs --file prefs.json set close-empty-source-tab true
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use marktab_background::{BackgroundService, PreferenceProvider, SimBrowser};
use marktab_common::{init_logging, LogConfig, LogFormat, ManualClock, SystemClock};
use marktab_core::Preferences;
use marktab_options::OptionsPage;
use marktab_session::{JsonFileArea, MemoryArea, PreferenceStore, SharedArea};
use std::path::PathBuf;
use std::sync::Arc;

mod script;

use script::{Replay, Script};

#[derive(Parser)]
#[command(name = "marktab-sim")]
#[command(about = "Replay browser events against the MarkTab background")]
struct Cli {
    /// Log format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an event script and print a JSON report
    Run {
        /// Script file
        script: PathBuf,
        /// Preferences file (sync storage); defaults apply when omitted
        #[arg(long)]
        prefs: Option<PathBuf>,
        /// Session storage file; kept in memory when omitted
        #[arg(long)]
        session: Option<PathBuf>,
    },

    /// Read or change stored preferences
    Prefs {
        /// Preferences file (sync storage)
        #[arg(short, long)]
        file: PathBuf,
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print the stored preferences
    Show,
    /// Change one toggle
    Set {
        toggle: Toggle,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    OpenInBackground,
    CloseEmptySourceTab,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    init_logging(log_config.with_format(cli.log_format));

    match cli.command {
        Commands::Run {
            script,
            prefs,
            session,
        } => run(script, prefs, session).await,
        Commands::Prefs { file, action } => prefs(file, action).await,
    }
}

async fn run(script: PathBuf, prefs: Option<PathBuf>, session: Option<PathBuf>) -> Result<()> {
    let script = Script::load(&script)?;

    let clock = Arc::new(ManualClock::new(script.start_ms));
    let sim = Arc::new(SimBrowser::new(clock.clone()));
    let provider: Arc<dyn PreferenceProvider> = match prefs {
        Some(path) => Arc::new(PreferenceStore::new(Arc::new(JsonFileArea::new(path)))),
        None => Arc::new(Preferences::default()),
    };
    let session_area: SharedArea = match session {
        Some(path) => Arc::new(JsonFileArea::new(path)),
        None => Arc::new(MemoryArea::new()),
    };

    let service = BackgroundService::builder(sim.clone(), provider)
        .session_area(session_area)
        .clock(clock.clone())
        .build();

    let report = Replay::new(clock, sim, service).run(&script).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn prefs(file: PathBuf, action: PrefsAction) -> Result<()> {
    let store = PreferenceStore::new(Arc::new(JsonFileArea::new(file)));
    let mut page = OptionsPage::new(store, Arc::new(SystemClock));
    page.load().await?;

    if let PrefsAction::Set { toggle, value } = action {
        match toggle {
            Toggle::OpenInBackground => page.set_open_in_background(value).await?,
            Toggle::CloseEmptySourceTab => page.set_close_empty_source_tab(value).await?,
        }
        if let Some(status) = page.status() {
            eprintln!("{status}");
        }
    }

    println!("{}", serde_json::to_string_pretty(&page.preferences())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use marktab_background::{InterceptOutcome, SourceDisposition};
    use marktab_core::TabId;

    fn replay(script: &Script) -> (Arc<SimBrowser>, Replay) {
        let clock = Arc::new(ManualClock::new(script.start_ms));
        let sim = Arc::new(SimBrowser::new(clock.clone()));
        let service = BackgroundService::builder(sim.clone(), Arc::new(Preferences::default()))
            .clock(clock.clone())
            .build();
        (sim.clone(), Replay::new(clock, sim, service))
    }

    #[tokio::test]
    async fn test_replay_bookmark_script() {
        let script: Script = serde_json::from_str(
            r#"{
                "startMs": 1000,
                "tabs": [{"id": 7, "history": ["https://old.example.com/"]}],
                "steps": [
                    {"op": "bookmark", "tab": 7, "url": "https://example.com/a"},
                    {"op": "advance", "ms": 1000},
                    {"op": "bookmark", "tab": 8, "url": "https://example.com/b"}
                ]
            }"#,
        )
        .unwrap();
        let (sim, replay) = replay(&script);

        let report = replay.run(&script).await.unwrap();

        assert_eq!(
            report.steps[0].outcomes,
            vec![InterceptOutcome::Redirected {
                new_tab: Some(TabId(8)),
                source: SourceDisposition::WentBack,
            }]
        );
        assert_eq!(report.steps[1].now_ms, 2000);
        // Tab 8 was opened by the background one second ago.
        assert!(matches!(
            report.steps[2].outcomes.as_slice(),
            [InterceptOutcome::Skipped { .. }]
        ));
        assert_eq!(sim.tabs().await.len(), 2);
    }

    #[tokio::test]
    async fn test_replay_unknown_tab_fails() {
        let script: Script = serde_json::from_str(
            r#"{"steps": [{"op": "bookmark", "tab": 3, "url": "https://example.com/"}]}"#,
        )
        .unwrap();
        let (_, replay) = replay(&script);

        assert!(replay.run(&script).await.is_err());
    }

    #[tokio::test]
    async fn test_prefs_command_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prefs.json");

        prefs(
            file.clone(),
            PrefsAction::Set {
                toggle: Toggle::CloseEmptySourceTab,
                value: true,
            },
        )
        .await
        .unwrap();

        let stored = PreferenceStore::new(Arc::new(JsonFileArea::new(file)))
            .load()
            .await
            .unwrap();
        assert!(stored.close_empty_source_tab);
        assert!(!stored.open_in_background);
    }
}
