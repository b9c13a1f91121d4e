//! # Asset Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Conferma interattiva prima di sovrascrivere i file in-place
//! - Creazione della configurazione e avvio dell'optimizer
//! - Stampa del riepilogo (o del report JSON) e dei warning
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (errori di parsing → exit code 1)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica il file di opzioni e applica i flag da CLI
//! 4. In self-replace chiede conferma (solo su terminale)
//! 5. Esegue `configure` con uno spinner attivo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-optimizer -i public -o dist --quality 85 --workers 8
//! asset-optimizer -i public --self --yes
//! ```

use anyhow::{Context, Result};
use asset_optimizer::optimizer::PathResolver;
use asset_optimizer::progress::ProgressManager;
use asset_optimizer::{Config, OptimizeError, OptimizationReport};
use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use dialoguer::Confirm;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asset-optimizer", version)]
#[command(about = "Optimize images, SVGs, JSON data and videos of a static site")]
struct Args {
    /// Directory containing the assets to optimize
    #[arg(short, long)]
    input: String,

    /// Output directory (required unless --self is given)
    #[arg(short, long)]
    output: Option<String>,

    /// Image quality (1-100, out-of-range values are clamped)
    #[arg(short, long, allow_negative_numbers = true)]
    quality: Option<i64>,

    /// Number of files encoded in parallel (defaults to the number of cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Replace the input files in place
    #[arg(
        short = 's',
        long = "self",
        visible_alias = "in-place",
        conflicts_with = "output"
    )]
    self_replace: bool,

    /// Skip the confirmation before replacing files in place
    #[arg(short = 'y', long, visible_aliases = ["yes", "force"])]
    skip_warning: bool,

    /// JSON options file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn output_path(&self) -> Result<&str> {
        if self.self_replace {
            return Ok(&self.input);
        }
        match self.output.as_deref() {
            Some(output) => Ok(output),
            None => Err(OptimizeError::Usage("--output is required unless --self is given".to_string()).into()),
        }
    }

    /// CLI flags override the values loaded from file
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(quality) = self.quality {
            config.image_quality = Config::clamp_quality(quality);
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config.verbose |= self.verbose;
        config.resolved()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.verbose);

    match run(args, std::io::stdin().is_terminal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow::anyhow!("Config file does not exist: {}", path.display()));
            }
            Config::from_file(path).await
        }
        None => match Config::default_path() {
            Some(default_path) => {
                debug!("Loading options from {}", default_path.display());
                Config::from_file(&default_path).await
            }
            None => Ok(Config::default()),
        },
    }
}

/// Asks before overwriting; refuses when nobody can answer
async fn confirm_self_replace(input: &str, interactive: bool) -> Result<bool> {
    if !interactive {
        return Err(OptimizeError::NonInteractive.into());
    }

    let prompt = format!(
        "Files in {} will be overwritten with their optimized versions. Continue?",
        input
    );
    let confirmed = tokio::task::spawn_blocking(move || {
        Confirm::new().with_prompt(prompt).default(false).interact()
    })
    .await
    .context("Confirmation prompt failed")?
    .context("Confirmation prompt failed")?;

    Ok(confirmed)
}

async fn run(args: Args, interactive: bool) -> Result<()> {
    let output = args.output_path()?.to_string();

    let is_self_replace = args.self_replace
        || PathResolver::resolve(Path::new(&args.input))? == PathResolver::resolve(Path::new(&output))?;

    if is_self_replace && !args.skip_warning && !confirm_self_replace(&args.input, interactive).await? {
        println!("{}", style("Cancelled, no files were changed.").yellow());
        return Ok(());
    }

    let config = args.apply_to(load_config(args.config.as_deref()).await?);

    let progress = if args.json {
        ProgressManager::hidden()
    } else {
        ProgressManager::spinner("Optimizing assets...")
    };
    let sink = progress.clone();
    let config = config.with_warning_sink(move |message| sink.warning(message));

    let result = asset_optimizer::configure(&args.input, &output, config).await;
    progress.finish();
    let report = result?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &OptimizationReport) {
    println!("{}", style(&report.summary.totals).green().bold());
    println!("{}", report.summary.files);
    println!("{}", style(&report.summary.destination).dim());

    for warning in &report.warnings {
        println!("{} {}", style("warning:").yellow(), warning);
    }
}
