//! docbuild CLI: refresh project documentation from its wiki source.
//!
//! Drives an external wiki compiler and an HTML-to-Markdown converter over
//! the configured document pairs, removing the HTML intermediates afterward.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
