mod scenario;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use emp_config::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "emp")]
#[command(about = "Replay a sponsor position scenario through the position engine")]
struct Args {
  /// Scenario file (JSON)
  scenario: PathBuf,

  /// Pretty-print the report
  #[arg(long)]
  pretty: bool,

  /// Include session events in each view
  #[arg(long)]
  events: bool,

  /// Log filter, overrides EMP_LOG
  #[arg(long)]
  log_level: Option<String>,
}

fn main() -> Result<()> {
  let args = Args::parse();
  let config = EngineConfig::from_env()?;

  let level = args.log_level.as_deref().unwrap_or(&config.log_level);
  emp_telemetry::init(level)?;

  let raw = fs::read_to_string(&args.scenario)
    .with_context(|| format!("reading scenario {}", args.scenario.display()))?;
  let scenario: scenario::Scenario =
    serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", args.scenario.display()))?;

  info!(path = %args.scenario.display(), steps = scenario.steps.len(), "replaying scenario");
  let report = scenario::replay(&scenario, config.engine_settings(), args.events)?;

  let out = if args.pretty {
    serde_json::to_string_pretty(&report)?
  } else {
    serde_json::to_string(&report)?
  };
  println!("{out}");
  Ok(())
}
