//! revsim command-line driver.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use revsim::{BatchRunner, Corpus, Lambda, RevsimConfig, RunReport, evaluate};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "revsim", version, about = "Revision similarity over W-shingle sketches")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Corpus root; overrides corpus.root
    #[arg(long, global = true)]
    dumps: Option<PathBuf>,

    /// Output directory; switches the store to the filesystem backend
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    /// Fan work out over all cores
    #[arg(long, global = true)]
    parallel: bool,

    /// Window widths, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    windows: Vec<usize>,

    /// Sketch bounds, comma separated (`inf` for the full set)
    #[arg(long, global = true, value_delimiter = ',')]
    lambdas: Vec<Lambda>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sketch every baseline and comparison revision.
    Shingle,
    /// Compare stored sketches against the baseline.
    Jaccard,
    /// Sketch, then compare.
    Run,
    /// Score each finite λ against λ = inf.
    Evaluate {
        /// Write the error table here instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Dump one (W, λ) result partition as CSV.
    Export {
        #[arg(long)]
        w: usize,
        #[arg(long)]
        lambda: Lambda,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.global)?;

    let config = load_config(&cli.global)?;
    let runner = BatchRunner::from_config(&config).context("failed to open store")?;

    match cli.command {
        Commands::Shingle => {
            let corpus = open_corpus(&config)?;
            print_report(&runner.generate_sketches(&corpus)?)?;
        }
        Commands::Jaccard => {
            let corpus = open_corpus(&config)?;
            print_report(&runner.compute_similarities(&corpus)?)?;
        }
        Commands::Run => {
            let corpus = open_corpus(&config)?;
            print_report(&runner.run(&corpus)?)?;
        }
        Commands::Evaluate { csv } => {
            let settings = runner.settings();
            let evaluation = evaluate(runner.results(), &settings.windows, &settings.lambdas)?;
            match csv {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    evaluation.write_csv(BufWriter::new(file))?;
                }
                None => {
                    evaluation.write_csv(io::stdout().lock())?;
                }
            }
        }
        Commands::Export { w, lambda, out } => {
            let rows = match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    runner.results().write_csv(w, lambda, BufWriter::new(file))?
                }
                None => runner.results().write_csv(w, lambda, io::stdout().lock())?,
            };
            info!(w, %lambda, rows, "csv_exported");
        }
    }

    Ok(())
}

fn init_tracing(args: &GlobalArgs) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if args.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn load_config(args: &GlobalArgs) -> anyhow::Result<RevsimConfig> {
    let mut config = match &args.config {
        Some(path) => RevsimConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RevsimConfig::default(),
    };

    if let Some(dumps) = &args.dumps {
        config.corpus.root = Some(dumps.clone());
    }
    if let Some(root) = &args.store_root {
        config.store.backend = "filesystem".to_string();
        config.store.root = Some(root.clone());
    }
    if args.parallel {
        config.batch.parallel = true;
    }
    if !args.windows.is_empty() {
        config.perceptual.windows = args.windows.clone();
    }
    if !args.lambdas.is_empty() {
        config.perceptual.lambdas = args.lambdas.clone();
    }

    config.validate()?;
    Ok(config)
}

fn open_corpus(config: &RevsimConfig) -> anyhow::Result<Corpus> {
    let Some(root) = &config.corpus.root else {
        bail!("no corpus root: set corpus.root or pass --dumps");
    };
    Ok(Corpus::scan_with(root, &config.corpus.layout())?)
}

fn print_report(report: &RunReport) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}
