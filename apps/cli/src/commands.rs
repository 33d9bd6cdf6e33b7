//! CLI command definitions, routing, and tracing setup.

use std::io::{IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docbuild_pipeline::{BuildConfig, ProgressReporter};
use docbuild_process::ToolSpec;
use docbuild_shared::{
    AppConfig, PauseMode, RunReport, StepStatus, init_config, load_config, validate_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docbuild: refresh project documentation from its wiki source.
#[derive(Parser)]
#[command(
    name = "docbuild",
    version,
    about = "Compile the project wiki to HTML and convert it into Markdown documentation.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file (defaults to ./docbuild.toml, then
    /// ~/.docbuild/docbuild.toml).
    #[arg(long, env = "DOCBUILD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the documentation: compile the wiki, convert to Markdown,
    /// remove the HTML intermediates.
    Build {
        /// Project root to build in (overrides config).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Abort remaining steps on the first failure.
        #[arg(long)]
        fail_fast: bool,

        /// Pause for acknowledgment before exit, even without a terminal.
        #[arg(long, conflicts_with = "no_pause")]
        pause: bool,

        /// Never pause before exit.
        #[arg(long)]
        no_pause: bool,

        /// Write the run report as JSON to this path ("-" for stdout).
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// Check that the configured external tools are available.
    Check,

    /// Remove leftover HTML intermediates from an interrupted run.
    Clean {
        /// Project root to clean (overrides config).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default docbuild.toml into the current directory.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docbuild=info",
        1 => "docbuild=debug",
        _ => "docbuild=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            root,
            fail_fast,
            pause,
            no_pause,
            report_json,
        } => cmd_build(
            config_path,
            root.as_deref(),
            fail_fast,
            pause,
            no_pause,
            report_json.as_deref(),
        ),
        Command::Check => cmd_check(config_path),
        Command::Clean { root } => cmd_clean(config_path, root.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

fn cmd_build(
    config_path: Option<&Path>,
    root: Option<&Path>,
    fail_fast: bool,
    pause: bool,
    no_pause: bool,
    report_json: Option<&Path>,
) -> Result<()> {
    let app_config = load_config(config_path)?;
    validate_config(&app_config)?;

    let mut build_config = BuildConfig::from(&app_config);
    if let Some(root) = root {
        build_config.root = root.to_path_buf();
    }
    if fail_fast {
        build_config.fail_fast = true;
    }

    info!(
        root = %build_config.root.display(),
        documents = build_config.documents.len(),
        "building documentation"
    );

    let reporter = CliProgress::new();
    let report = docbuild_pipeline::build(&build_config, &reporter)?;

    print_summary(&report);

    if let Some(path) = report_json {
        write_report_json(&report, path)?;
    }

    let pause_mode = if pause {
        PauseMode::Always
    } else if no_pause {
        PauseMode::Never
    } else {
        app_config.behavior.pause
    };
    maybe_pause(pause_mode)?;

    let failed = report.failed_steps().count();
    if failed > 0 {
        return Err(eyre!("{failed} step(s) failed"));
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let ok = report
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Ok)
        .count();
    let failed = report.failed_steps().count();
    let skipped = report
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Skipped)
        .count();

    println!();
    if report.success {
        println!("  Documentation build finished!");
    } else {
        println!("  Documentation build finished with failures.");
    }
    println!("  Run:    {}", report.run_id);
    println!("  Steps:  {ok} ok, {failed} failed, {skipped} skipped");
    for doc in &report.documents {
        if doc.exists {
            println!("  Output: {} ({} bytes)", doc.markdown.display(), doc.bytes);
        } else {
            println!("  Output: {} (missing)", doc.markdown.display());
        }
    }
    println!("  Time:   {:.1}s", report.duration_ms as f64 / 1000.0);
    println!();
}

fn write_report_json(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if path == Path::new("-") {
        println!("{json}");
    } else {
        std::fs::write(path, json)
            .map_err(|e| eyre!("failed to write report to {}: {e}", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }
    Ok(())
}

/// The pause is a convenience for terminal sessions; automated invocations
/// must never block on it.
fn maybe_pause(mode: PauseMode) -> Result<()> {
    let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    let should_pause = match mode {
        PauseMode::Always => true,
        PauseMode::Never => false,
        PauseMode::Auto => interactive,
    };
    if !should_pause {
        return Ok(());
    }

    print!("Press Enter to exit...");
    std::io::stdout().flush()?;
    let mut buf = [0u8; 1];
    let _ = std::io::stdin().read(&mut buf)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_converted(&self, markdown: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converted [{current}/{total}] {markdown}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn cmd_check(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let tools = [
        ("compiler", &config.tools.compiler),
        ("converter", &config.tools.converter),
    ];

    let mut missing = 0;
    for (label, tool) in tools {
        let spec = ToolSpec::from(tool);
        match docbuild_process::probe(&spec, &tool.probe_args) {
            Ok(version) if !version.is_empty() => {
                println!("  {label}: {} ({version})", tool.command);
            }
            Ok(_) => {
                println!("  {label}: {} (available)", tool.command);
            }
            Err(e) => {
                println!("  {label}: {} NOT AVAILABLE", tool.command);
                tracing::warn!(error = %e, "tool probe failed");
                missing += 1;
            }
        }
    }

    if missing > 0 {
        return Err(eyre!("{missing} tool(s) not available"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

fn cmd_clean(config_path: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let app_config = load_config(config_path)?;
    validate_config(&app_config)?;

    let mut build_config = BuildConfig::from(&app_config);
    if let Some(root) = root {
        build_config.root = root.to_path_buf();
    }

    let removed = docbuild_pipeline::clean(&build_config)?;
    if removed.is_empty() {
        println!("Nothing to clean.");
    } else {
        for path in &removed {
            println!("Removed {}", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config: AppConfig = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
