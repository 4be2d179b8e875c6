//! Ripcord CLI application
//!
//! Interactive prompt for an agent whose queries can be cancelled at any
//! moment with a single key.
//!
//! ```bash
//! ripcord                      # interactive prompt
//! ripcord "!sleep 5"           # one query, then exit
//! ripcord --interrupt-key f2   # cancel with F2 instead of ESC
//! ```

mod app;
mod args;
mod console;
mod demo_llm;
mod logging;
mod prompt;
mod signal_handler;

use clap::Parser;
use ripcord_core::config::load_config;

use crate::app::App;
use crate::args::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let config = cli.apply(config)?;
    logging::init(&config.logging)?;

    let mut app = App::new(config, cli.yes, cli.verbose);
    app.start()?;

    match cli.query.as_deref() {
        Some(query) => app.run_once(query).await,
        None => app.run_interactive().await,
    }
}
