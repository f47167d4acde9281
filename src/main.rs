mod app;
mod bus;
mod config;
mod event;
mod filter;
mod logging;
mod provider;
mod ui;
mod widget;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dashfilter")]
#[command(about = "A terminal dashboard with a cross-widget selection filter")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./dashfilter.yaml or $XDG_CONFIG_HOME/dashfilter/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Directory for log files (default: $XDG_DATA_HOME/dashfilter/logs)
  #[arg(long)]
  log_dir: Option<PathBuf>,

  /// Start with the light theme regardless of config
  #[arg(long)]
  light: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init(args.log_dir)?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override theme if specified on command line
  let config = if args.light {
    config::Config {
      theme: config::ThemeName::Light,
      ..config
    }
  } else {
    config
  };

  // Initialize and run the dashboard
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
