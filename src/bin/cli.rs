use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use polars::prelude::{AnyValue, Column, DataFrame};
use schedule_engine::engine::{self, ScheduleRequest};
use schedule_engine::{EngineConfig, ScheduleError, gantt_dataframe};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "cli", version, about = "Task-dependency scheduling engine")]
struct Cli {
    /// TOML config file; defaults to ./schedule-engine.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check references, duplicates and cycles
    Validate(InputArgs),
    /// Critical path with per-task slack
    CriticalPath {
        #[command(flatten)]
        input: InputArgs,
        /// One summary line instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Full schedule plus resource allocation
    Schedule(InputArgs),
    /// Per-resource load
    Allocation(InputArgs),
    /// Committed dates as a text table
    Gantt {
        #[command(flatten)]
        input: InputArgs,
        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct InputArgs {
    /// JSON request file, or `-` for stdin
    #[arg(default_value = "-")]
    input: String,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if let Some(path) = &cli.config {
        anyhow::ensure!(path.exists(), "config file {} not found", path.display());
    }
    let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let defaults = config.default_options();

    match cli.command {
        Command::Validate(args) => {
            let request = read_request(&args)?.or_defaults(&defaults);
            print_json(&engine::validate_dependencies(&request).map_err(engine_error)?)
        }
        Command::CriticalPath { input, summary } => {
            let request = read_request(&input)?.or_defaults(&defaults);
            let path = engine::critical_path(&request).map_err(engine_error)?;
            if summary {
                println!("{}", path.to_cli_summary());
                Ok(())
            } else {
                print_json(&path)
            }
        }
        Command::Schedule(args) => {
            let request = read_request(&args)?.or_defaults(&defaults);
            print_json(&engine::run(&request).map_err(engine_error)?)
        }
        Command::Allocation(args) => {
            let request = read_request(&args)?.or_defaults(&defaults);
            print_json(&engine::resource_allocation(&request).map_err(engine_error)?)
        }
        Command::Gantt { input, json } => {
            let request = read_request(&input)?.or_defaults(&defaults);
            let rows = engine::gantt(&request).map_err(engine_error)?;
            if json {
                return print_json(&rows);
            }
            let df = gantt_dataframe(&rows).context("failed to build gantt table")?;
            print!("{}", render_df_as_text_table(&df));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("SCHEDULE_ENGINE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

fn engine_error(err: ScheduleError) -> anyhow::Error {
    anyhow::anyhow!("{}: {}", err.code(), err)
}

fn read_request(args: &InputArgs) -> anyhow::Result<ScheduleRequest> {
    let raw = if args.input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        buf
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read request file {}", args.input))?
    };
    serde_json::from_str(&raw).context("request is not a valid scheduling request")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cell_text(col: &Column, row_idx: usize) -> String {
    match col.get(row_idx) {
        Ok(AnyValue::Null) | Err(_) => String::new(),
        Ok(AnyValue::Int32(v)) => v.to_string(),
        Ok(AnyValue::Int64(v)) => v.to_string(),
        Ok(AnyValue::Float64(v)) => format!("{v:.1}"),
        Ok(AnyValue::Boolean(v)) => String::from(if v { "yes" } else { "" }),
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(AnyValue::List(inner)) => match inner.i32() {
            Ok(ca) => ca
                .into_iter()
                .flatten()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
            Err(_) => inner.to_string(),
        },
        Ok(av) => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let cells: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| columns.iter().map(|col| cell_text(col, row_idx)).collect())
        .collect();

    // Compute column widths
    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, s) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(s.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, s) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(s);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(s.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}
