use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rusty_fence::config::{FilterConfig, MethodKind};
use rusty_fence::data::{loader, writer};
use rusty_fence::stats::Deviation;
use rusty_fence::{FilteredTable, Table};

/// Remove outlier rows from a table using quartile fences or sigma clipping.
#[derive(Debug, Parser)]
#[command(name = "rusty-fence", version, about)]
struct Cli {
    /// Input table (.csv, .json, .parquet)
    input: PathBuf,

    /// Write the filtered table here (format from the extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with filter settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    method: Option<MethodKind>,

    /// Only bound and filter on this column
    #[arg(short, long)]
    column: Option<String>,

    /// IQR multiplier
    #[arg(short = 'k')]
    k: Option<f64>,

    /// Use the extreme IQR multiplier (implies --method iqr)
    #[arg(long)]
    extreme: bool,

    #[arg(long)]
    sigma_low: Option<f64>,

    #[arg(long)]
    sigma_high: Option<f64>,

    /// Use the population standard deviation for sigma clipping
    #[arg(long)]
    population: bool,

    /// Estimate column bounds one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Print the bounds of each numeric column and exit without filtering
    #[arg(long)]
    bounds_only: bool,
}

impl Cli {
    fn apply(&self, config: &mut FilterConfig) {
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(column) = &self.column {
            config.column = Some(column.clone());
        }
        if let Some(k) = self.k {
            config.iqr.k = k;
        }
        if self.extreme {
            config.method = MethodKind::Iqr;
            config.iqr.k = config.iqr.extreme_k;
        }
        if let Some(low) = self.sigma_low {
            config.sigma.low = low;
        }
        if let Some(high) = self.sigma_high {
            config.sigma.high = high;
        }
        if self.population {
            config.sigma.deviation = Deviation::Population;
        }
        if self.sequential {
            config.parallel = false;
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FilterConfig::load(path)?,
        None => FilterConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;
    info!("method: {}", config.method());

    let table = loader::load_file(&cli.input)?;

    if cli.bounds_only {
        return print_bounds(&table, &config);
    }

    let filter = config.dataset_filter();
    let filtered = match &config.column {
        Some(column) => filter.filter_column(&table, column),
        None => filter.filter_table(&table),
    }
    .context("filtering table")?;
    print_summary(&filtered);

    if let Some(output) = &cli.output {
        writer::save_file(filtered.table(), output)?;
    }
    Ok(())
}

fn print_bounds(table: &Table, config: &FilterConfig) -> Result<()> {
    let names: Vec<String> = match &config.column {
        Some(column) => vec![column.clone()],
        None => table
            .numeric_descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect(),
    };

    match config.method {
        MethodKind::Iqr => {
            for name in &names {
                let fences = config.column_fences(table.column(name)?)?;
                println!(
                    "{name}: q1={} q3={} iqr={} applied={} extreme={}",
                    fences.q1, fences.q3, fences.iqr, fences.mild, fences.extreme
                );
            }
        }
        MethodKind::Sigma => {
            let method = config.method();
            for name in &names {
                let bounds = method.column_bounds(table.column(name)?)?;
                println!("{name}: {bounds}");
            }
        }
    }
    Ok(())
}

fn print_summary(filtered: &FilteredTable) {
    for applied in filtered.applied() {
        println!("{}: {}", applied.column, applied.bounds);
    }
    println!(
        "kept {} rows, removed {}",
        filtered.num_rows(),
        filtered.removed()
    );
}
