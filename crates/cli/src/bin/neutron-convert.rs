use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use neutron_convert::config::load_manifest;
use neutron_convert::export::{coords, summary, writer_for_path};
use neutron_convert::{ConvertMode, Dim, Measurement, convert_with_mode};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert the flight-time axis of a measurement manifest"
)]
struct Cli {
    /// Measurement manifest (YAML, or TOML by extension)
    #[arg(long)]
    input: PathBuf,

    /// Source axis (defaults to the manifest's conversion section)
    #[arg(long)]
    from: Option<String>,

    /// Target axis (defaults to the manifest's conversion section)
    #[arg(long)]
    to: Option<String>,

    /// Scattering mode; `auto` infers it from `sample_position`
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Write the converted coordinate as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a JSON summary of the converted coordinates
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum ModeArg {
    Auto,
    Scatter,
    NoScatter,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let manifest = load_manifest(&cli.input)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    let conversion = manifest.conversion.as_ref();

    let from = match (&cli.from, conversion) {
        (Some(from), _) => Dim::new(from.as_str()),
        (None, Some(c)) => c.dims().0,
        (None, None) => bail!("no source axis: pass --from or add a `conversion` section"),
    };
    let to = match (&cli.to, conversion) {
        (Some(to), _) => Dim::new(to.as_str()),
        (None, Some(c)) => c.dims().1,
        (None, None) => bail!("no target axis: pass --to or add a `conversion` section"),
    };

    let dataset = manifest.to_dataset()?;
    let mode = match cli.mode {
        ModeArg::Scatter => ConvertMode::Scatter,
        ModeArg::NoScatter => ConvertMode::NoScatter,
        ModeArg::Auto => conversion
            .and_then(|c| c.mode)
            .unwrap_or_else(|| ConvertMode::infer(&dataset.meta())),
    };
    info!(%from, %to, ?mode, items = dataset.len(), "converting");

    let converted = convert_with_mode(dataset, &from, &to, mode)
        .with_context(|| format!("converting {from} to {to}"))?;

    let report = summary::ConversionSummary::new(
        &converted,
        from.as_str(),
        to.as_str(),
        mode,
        Utc::now(),
    );
    println!("Converted {from} -> {to} ({mode:?})");
    for coord in &report.coords {
        match (coord.min, coord.max) {
            (Some(min), Some(max)) => println!(
                "  {:<24} [{}] {:>8} values  {:.6} .. {:.6}",
                coord.name, coord.unit, coord.len, min, max
            ),
            _ => println!("  {:<24} [{}] {:>8} values", coord.name, coord.unit, coord.len),
        }
    }

    if let Some(path) = &cli.csv {
        let writer = writer_for_path(path)?;
        coords::write_csv(writer, &converted, &to)?;
        info!(path = %path.display(), "wrote coordinate CSV");
    }
    if let Some(path) = &cli.summary {
        summary::write_json(path, &report)?;
        info!(path = %path.display(), "wrote summary");
    }

    Ok(())
}
