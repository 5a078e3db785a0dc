use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use trade_charts::views::{ViewCatalog, ViewKind};
use trade_charts::ReportContext;

#[derive(Parser)]
#[command(name = "trade-charts", version, about = "Chart data for German foreign-trade statistics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the chart figures of a view and print them as JSON
    Render {
        /// total-volume, monthly, top-partners, top-goods, diff-countries, diff-goods
        view: ViewKind,
        /// Table the view reads (.csv, .json or .parquet)
        #[arg(long)]
        data: PathBuf,
        /// Selected year, defaults to the latest year in the table
        #[arg(long)]
        year: Option<i32>,
        /// JSON file with per-view overrides
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// List the years a table contains
    Years {
        view: ViewKind,
        #[arg(long)]
        data: PathBuf,
    },
    /// Show the configured views
    Views {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            view,
            data,
            year,
            config,
            output,
            compact,
        } => render(view, &data, year, config.as_deref(), output.as_deref(), compact),
        Commands::Years { view, data } => years(view, &data),
        Commands::Views { config } => views(config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn catalog(config: Option<&Path>) -> Result<ViewCatalog> {
    match config {
        Some(path) => ViewCatalog::load(path)
            .with_context(|| format!("reading view config {}", path.display())),
        None => Ok(ViewCatalog::default()),
    }
}

fn load(ctx: &mut ReportContext, view: ViewKind, data: &Path) -> Result<()> {
    ctx.load_for_view(view, data)
        .with_context(|| format!("loading {} table from {}", view.schema(), data.display()))
}

fn render(
    view: ViewKind,
    data: &Path,
    year: Option<i32>,
    config: Option<&Path>,
    output: Option<&Path>,
    compact: bool,
) -> Result<()> {
    let mut ctx = ReportContext::new(catalog(config)?);
    load(&mut ctx, view, data)?;

    let figures = ctx
        .render(view, year)
        .with_context(|| format!("rendering {view}"))?;
    info!("{view}: {} figures", figures.len());

    let json = if compact {
        serde_json::to_string(&figures)?
    } else {
        serde_json::to_string_pretty(&figures)?
    };
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("writing {}", path.display()))?,
        None => writeln!(std::io::stdout().lock(), "{json}")?,
    }
    Ok(())
}

fn years(view: ViewKind, data: &Path) -> Result<()> {
    let mut ctx = ReportContext::default();
    load(&mut ctx, view, data)?;
    let mut out = std::io::stdout().lock();
    for year in ctx.available_years(view)? {
        writeln!(out, "{year}")?;
    }
    Ok(())
}

fn views(config: Option<&Path>) -> Result<()> {
    let catalog = catalog(config)?;
    let mut out = std::io::stdout().lock();
    for view in catalog.iter() {
        writeln!(
            out,
            "{:<15} {:<13} step {:>8}  top {:>2}  extremes {}",
            view.kind.name(),
            view.kind.schema().name(),
            trade_charts::fmt::magnitude(view.axis.step_size, &view.axis.units),
            view.top_n,
            view.extremes_k
        )?;
    }
    Ok(())
}
