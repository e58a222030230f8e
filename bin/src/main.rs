//! CLI for the hfrisk risk statistics library.
//!
//! Every subcommand reads a CSV return table (one column per asset, rows are
//! periods) and prints the result as a table, or as JSON with `--json`.

use clap::{Args, Parser, Subcommand};
use hfrisk::{
    ConvexityAnalysis, ReturnTable, StatsConfig, SummaryStatistics, attribute_fit, by_regime,
    drawdowns, fit_factor_model, max_drawdown, read_return_table, traits::Configurable,
};
use polars::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hfrisk")]
#[command(about = "Risk and performance statistics for hedge fund returns", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Location and layout of the input return table.
#[derive(Args)]
struct Input {
    /// CSV file with one return column per asset
    path: PathBuf,

    /// Column holding the period index (dates)
    #[arg(long)]
    index_column: Option<String>,

    /// Column holding the market regime label
    #[arg(long)]
    regime_column: Option<String>,
}

impl Input {
    fn load(&self) -> hfrisk::Result<ReturnTable> {
        read_return_table(
            &self.path,
            self.index_column.as_deref(),
            self.regime_column.as_deref(),
        )
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summary statistics for every return column
    Summary {
        #[command(flatten)]
        input: Input,
        /// JSON file with a statistics configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Underwater curve and maximum drawdown of one column
    Drawdowns {
        #[command(flatten)]
        input: Input,
        /// Return column
        #[arg(long)]
        column: String,
    },
    /// Mean returns by market regime
    Regimes {
        #[command(flatten)]
        input: Input,
    },
    /// Factor contribution to risk from a factor regression
    Attribution {
        #[command(flatten)]
        input: Input,
        /// Column regressed on the factors
        #[arg(long)]
        response: String,
        /// Comma separated factor columns
        #[arg(long, value_delimiter = ',', required = true)]
        factors: Vec<String>,
        /// Include an intercept in the regression
        #[arg(long)]
        intercept: bool,
    },
    /// Quadratic exposure of one column to a factor
    Convexity {
        #[command(flatten)]
        input: Input,
        /// Factor column (x)
        #[arg(long)]
        factor: String,
        /// Response column (y)
        #[arg(long)]
        response: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "command failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> hfrisk::Result<()> {
    match &cli.command {
        Commands::Summary { input, config } => summary(&input.load()?, config.as_ref(), cli.json),
        Commands::Drawdowns { input, column } => drawdown_curve(&input.load()?, column, cli.json),
        Commands::Regimes { input } => regimes(&input.load()?, cli.json),
        Commands::Attribution {
            input,
            response,
            factors,
            intercept,
        } => attribution(&input.load()?, response, factors, *intercept, cli.json),
        Commands::Convexity {
            input,
            factor,
            response,
        } => convexity(&input.load()?, factor, response, cli.json),
    }
}

/// Print summary statistics, reporting failed columns separately.
fn summary(table: &ReturnTable, config: Option<&PathBuf>, json: bool) -> hfrisk::Result<()> {
    let config = match config {
        Some(path) => StatsConfig::from_json_file(path)?,
        None => StatsConfig::default(),
    };
    let summary = SummaryStatistics::with_config(config).summarize(table)?;

    if json {
        let failures: Vec<_> = summary
            .failures
            .iter()
            .map(|f| serde_json::json!({ "column": f.column, "error": f.error.to_string() }))
            .collect();
        let output = serde_json::json!({ "records": summary.records, "failures": failures });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", summary.to_dataframe()?);
    for failure in &summary.failures {
        eprintln!("Skipped {}: {}", failure.column, failure.error);
    }
    Ok(())
}

/// Print the underwater curve of one column and its maximum drawdown.
fn drawdown_curve(table: &ReturnTable, column: &str, json: bool) -> hfrisk::Result<()> {
    let series = table.series(column)?;
    let curve = drawdowns(series.values())?;
    let worst = max_drawdown(series.values())?;

    if json {
        let output = serde_json::json!({
            "column": column,
            "drawdowns": curve,
            "max_drawdown": worst,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut columns = Vec::with_capacity(2);
    if let Some(index) = table.index_column() {
        columns.push(table.frame().column(index)?.clone());
    }
    columns.push(Column::new("drawdown".into(), curve));
    println!("{}", DataFrame::new(columns)?);
    println!("Maximum drawdown of {column}: {worst:.4}");
    Ok(())
}

fn regimes(table: &ReturnTable, json: bool) -> hfrisk::Result<()> {
    let means = by_regime(table)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&means)?);
    } else {
        println!("{}", means.to_dataframe()?);
    }
    Ok(())
}

/// Fit the factor regression, then decompose its variance by factor.
fn attribution(
    table: &ReturnTable,
    response: &str,
    factors: &[String],
    intercept: bool,
    json: bool,
) -> hfrisk::Result<()> {
    let names: Vec<&str> = factors.iter().map(String::as_str).collect();
    let fit = fit_factor_model(table, response, &names, intercept)?;
    let result = attribute_fit(&fit, table)?;

    if json {
        let output = serde_json::json!({
            "response": response,
            "intercept": fit.intercept,
            "betas": fit.betas.to_vec(),
            "r_squared": fit.r_squared,
            "attribution": result,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let Some(alpha) = fit.intercept {
        println!("Intercept: {alpha:.6}");
    }
    for (name, beta) in fit.factors.iter().zip(fit.betas.iter()) {
        println!("Beta {name}: {beta:.4}");
    }
    println!("R-squared: {:.4}", fit.r_squared);
    println!("{}", result.to_dataframe()?);
    Ok(())
}

fn convexity(table: &ReturnTable, factor: &str, response: &str, json: bool) -> hfrisk::Result<()> {
    let fit = ConvexityAnalysis::new().fit_columns(table, factor, response)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&fit)?);
        return Ok(());
    }

    println!("{response} = {:.4} * {factor} + {:.4} * {factor}^2", fit.linear(), fit.quadratic());
    println!("{}", fit.curve_dataframe()?);
    Ok(())
}
