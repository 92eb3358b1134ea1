use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracker_core::{Action, FailureScope};

#[derive(Parser, Debug)]
#[command(name = "scrape-tracker")]
#[command(about = "Track scraping jobs on a remote scraping service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// RON configuration file; defaults to tracker.ron when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory holding the tracked item list
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// How failures are attributed: batch or item
    #[arg(long, global = true, value_parser = parse_failure_scope)]
    pub failure_scope: Option<FailureScope>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit URLs as a new scraping batch
    Submit {
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Poll progress until every tracked item settles
    Watch {
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run a lifecycle action on one item
    Action {
        id: String,
        #[arg(value_parser = parse_action)]
        action: Action,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Print tracked items without contacting the service
    Status,
}

fn parse_action(raw: &str) -> Result<Action, String> {
    Action::parse(raw).ok_or_else(|| {
        let names: Vec<&str> = Action::ALL.iter().map(|action| action.as_str()).collect();
        format!("unknown action '{raw}', expected one of: {}", names.join(", "))
    })
}

fn parse_failure_scope(raw: &str) -> Result<FailureScope, String> {
    FailureScope::parse(raw).ok_or_else(|| format!("unknown failure scope '{raw}', expected batch or item"))
}
