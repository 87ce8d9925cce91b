//! giza-verify - browser-driven verification for the pyramid experience
//!
//! Drives a real Chromium against a local dev server, walks the
//! landing → "Begin Journey" → scene transition, and captures
//! screenshot evidence for human inspection.

mod browser;
mod report;
mod runner;
mod scenario;

use clap::Parser;
use runner::RunOverrides;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Manual verification runner for the Giza pyramid experience.
#[derive(Parser, Debug)]
#[command(name = "giza-verify", version, about, long_about = None)]
struct Args {
    /// Scenario to run (see --list)
    scenario: Option<String>,

    /// Override the scenario's target URL
    #[arg(long, env = "GIZA_VERIFY_URL")]
    url: Option<String>,

    /// Directory screenshots are written under
    #[arg(long, env = "GIZA_VERIFY_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Explicit Chrome/Chromium executable to launch
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Print the run report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// List available scenarios and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "giza_verify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();

    if args.list {
        print_catalog();
        return Ok(());
    }

    let name = args
        .scenario
        .as_deref()
        .unwrap_or(scenario::DEFAULT_SCENARIO);
    let Some(scenario) = scenario::find(name) else {
        eprintln!("Unknown scenario '{name}'. Available scenarios:");
        print_catalog();
        std::process::exit(2);
    };

    let overrides = RunOverrides {
        url: args.url,
        out_dir: args.out_dir,
        headed: args.headed,
        chrome: args.chrome,
    };

    let report = runner::run(&scenario, &overrides).await;

    // A failed run is still a normal exit: the transcript and any error
    // screenshot are the evidence, and a human reads them either way.
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    Ok(())
}

fn print_catalog() {
    for scenario in scenario::catalog() {
        println!("  {:<14} {}", scenario.name, scenario.summary);
    }
}
