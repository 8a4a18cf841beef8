use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use std::{fs, path::PathBuf};
use tracing::info;

use crate::{
    config::{Destination, GenConfig, QuantityRange},
    generate,
    inspect::{InspectOptions, TapeReport, inspect_path},
    pool::SymbolPool,
    price::PriceBounds,
};

/// Synthetic trade tape generator with fractal symbol popularity
#[derive(Parser)]
#[command(name = "trade-tape")]
#[command(
    version,
    about = "Generates a CSV trade tape with skewed symbol popularity and random-walk prices"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a trade tape
    Generate {
        #[command(flatten)]
        args: GenArgs,

        /// Also write the run summary as JSON to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Build the symbol pool only and report its skew
    Pool {
        /// Self-similarity ratio, strictly between 0 and 1
        #[arg(long, default_value_t = 0.3)]
        fraction: f64,

        /// Size of the symbol universe
        #[arg(long, default_value_t = 70_000)]
        initial_count: u32,

        #[arg(long)]
        seed: Option<u64>,

        /// How many of the heaviest symbols to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Validate an existing tape and print per-symbol trade counts
    Inspect {
        path: PathBuf,

        #[arg(long, requires = "max_price", allow_negative_numbers = true)]
        min_price: Option<i64>,

        #[arg(long, requires = "min_price", allow_negative_numbers = true)]
        max_price: Option<i64>,

        #[arg(long, requires = "max_qty")]
        min_qty: Option<u64>,

        #[arg(long, requires = "min_qty")]
        max_qty: Option<u64>,

        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Print the effective generator configuration as JSON
    Config {
        #[command(flatten)]
        args: GenArgs,
    },
}

/// Generator settings; each flag overrides the config file, which overrides the defaults.
#[derive(Args)]
struct GenArgs {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of trades to emit
    #[arg(long)]
    trades: Option<u64>,

    /// Size of the symbol universe
    #[arg(long)]
    initial_count: Option<u32>,

    /// Self-similarity ratio, strictly between 0 and 1
    #[arg(long)]
    fraction: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    min_price: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    max_price: Option<i64>,

    #[arg(long)]
    min_qty: Option<u64>,

    #[arg(long)]
    max_qty: Option<u64>,

    #[arg(long, allow_negative_numbers = true)]
    delta_min: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    delta_max: Option<i64>,

    /// Output file, or `-` for stdout
    #[arg(long, short)]
    output: Option<Destination>,

    /// Seed for a reproducible tape
    #[arg(long)]
    seed: Option<u64>,

    /// Progress log interval in trades (0 disables)
    #[arg(long)]
    progress_every: Option<u64>,

    /// Write batch size in bytes
    #[arg(long)]
    batch_bytes: Option<usize>,
}

impl GenArgs {
    fn resolve(self) -> anyhow::Result<GenConfig> {
        let mut cfg = match &self.config {
            Some(path) => GenConfig::from_json_file(path)?,
            None => GenConfig::default(),
        };
        if let Some(v) = self.trades {
            cfg.num_trades = v;
        }
        if let Some(v) = self.initial_count {
            cfg.initial_unique_count = v;
        }
        if let Some(v) = self.fraction {
            cfg.fractal_fraction = v;
        }
        if let Some(v) = self.min_price {
            cfg.min_price = v;
        }
        if let Some(v) = self.max_price {
            cfg.max_price = v;
        }
        if let Some(v) = self.min_qty {
            cfg.min_qty = v;
        }
        if let Some(v) = self.max_qty {
            cfg.max_qty = v;
        }
        if let Some(v) = self.delta_min {
            cfg.price_delta_min = v;
        }
        if let Some(v) = self.delta_max {
            cfg.price_delta_max = v;
        }
        if let Some(v) = self.output {
            cfg.output = v;
        }
        if let Some(v) = self.progress_every {
            cfg.progress_every = v;
        }
        if let Some(v) = self.batch_bytes {
            cfg.batch_bytes = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        Ok(cfg)
    }
}

fn handle_generate(args: GenArgs, summary_path: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = args.resolve()?;
    let summary = generate::run(&cfg).context("trade generation failed")?;
    if let Some(path) = summary_path {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
        info!("summary written to {}", path.display());
    }
    Ok(())
}

fn handle_pool(fraction: f64, initial_count: u32, seed: Option<u64>, top: usize) -> anyhow::Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    let pool = SymbolPool::build(fraction, initial_count, &mut rng)?;
    let heaviest = pool.top(top);
    let heavy_weight: u32 = heaviest.iter().map(|(_, m)| m).sum();

    println!("------ Symbol Pool ------");
    println!("seed: {}", seed);
    println!("unique symbols: {}", pool.unique_count());
    println!("pool length: {}", pool.len());
    println!("truncation levels: {:?}", pool.levels());
    println!(
        "top {} symbols hold {:.2}% of the pool:",
        heaviest.len(),
        100.0 * heavy_weight as f64 / pool.len() as f64
    );
    for (symbol, multiplicity) in heaviest {
        println!("{}: {}", symbol, multiplicity);
    }
    println!("--------------------------");
    Ok(())
}

fn print_report(report: &TapeReport, top: usize) {
    println!("------ Trade Tape ------");
    println!("rows: {}", report.rows);
    println!("unique symbols: {}", report.unique_symbols());
    if let (Some(lo), Some(hi)) = (report.min_price, report.max_price) {
        println!("price range: {}..={}", lo, hi);
    }
    if let (Some(lo), Some(hi)) = (report.min_qty, report.max_qty) {
        println!("quantity range: {}..={}", lo, hi);
    }
    println!(
        "top {} symbols take {:.2}% of trades:",
        top,
        100.0 * report.top_share(top)
    );
    for (symbol, count) in report.top(top) {
        println!("{}: {}", symbol, count);
    }
    println!("--------------------------");
}

pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Generate { args, summary } => handle_generate(args, summary),
        Commands::Pool {
            fraction,
            initial_count,
            seed,
            top,
        } => handle_pool(fraction, initial_count, seed, top),
        Commands::Inspect {
            path,
            min_price,
            max_price,
            min_qty,
            max_qty,
            top,
        } => {
            let opts = InspectOptions {
                price: min_price.zip(max_price).map(|(min, max)| PriceBounds { min, max }),
                quantity: min_qty.zip(max_qty).map(|(min, max)| QuantityRange { min, max }),
            };
            let report = inspect_path(&path, opts)
                .with_context(|| format!("tape {} failed inspection", path.display()))?;
            print_report(&report, top);
            Ok(())
        }
        Commands::Config { args } => {
            let cfg = args.resolve()?;
            cfg.validate()?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            Ok(())
        }
    }
}
