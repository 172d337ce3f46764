use anyhow::{Context, Result};
use calcium_common::{Dataset, init_tracer};
use calcium_events::{DatasetSummary, DetectorSettings, analyze, metrics, save_cell_traces};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    net::SocketAddr,
    path::PathBuf,
};
use tracing::{info, level_filters::LevelFilter, warn};

// cargo run --bin calcium-events -- --dataset dataset.json --output results.json --k-up 2.0

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON dataset, as written by the simulator.
    #[clap(long)]
    dataset: PathBuf,

    /// Where to write the analysis as JSON, stdout if absent.
    #[clap(long)]
    output: Option<PathBuf>,

    /// JSON file of detector settings, used in place of the settings flags.
    #[clap(long)]
    settings: Option<PathBuf>,

    /// Directory into which per-cell diagnostic traces are written.
    #[clap(long)]
    save_path: Option<PathBuf>,

    /// If set, prometheus metrics are served from this address.
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    /// Default level of the log filter, overridden by RUST_LOG.
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    #[clap(flatten)]
    detector_settings: DetectorSettings,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let tracer = init_tracer!(args.log_level);
    info!("Starting {}", tracer.service_name());

    if let Some(address) = args.observability_address {
        let builder = PrometheusBuilder::new();
        builder
            .with_http_listener(address)
            .install()
            .context("prometheus metrics exporter should be setup")?;
    }
    metrics::describe();
    calcium_common::metrics::component_info_metric("calcium-events");

    let settings: DetectorSettings = match &args.settings {
        Some(path) => serde_json::from_reader(BufReader::new(
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
        ))
        .with_context(|| format!("cannot parse settings {}", path.display()))?,
        None => args.detector_settings.clone(),
    };

    let dataset: Dataset = serde_json::from_reader(BufReader::new(
        File::open(&args.dataset)
            .with_context(|| format!("cannot open {}", args.dataset.display()))?,
    ))
    .with_context(|| format!("cannot parse dataset {}", args.dataset.display()))?;

    let summary = DatasetSummary::new(&dataset);
    info!(
        "Loaded {} cells of {} samples over {:.2} minutes ({:.3} Hz)",
        summary.num_cells, summary.num_samples, summary.duration, summary.sampling_rate_hz
    );

    let result = analyze(&dataset, &settings)?;
    info!(
        "Analysed {} cells, {} failures",
        result.cells.len(),
        result.failures.len()
    );
    for response in &result.responses {
        info!(
            "{}: {}/{} cells responded",
            response.stimulus_name, response.responding, response.analysed
        );
    }

    if let Some(save_path) = &args.save_path {
        std::fs::create_dir_all(save_path)?;
        for analysis in &result.cells {
            match dataset.cell(&analysis.cell_id) {
                Some(series) => save_cell_traces(save_path, series, analysis)?,
                None => warn!("Cell {} missing from dataset", analysis.cell_id),
            }
        }
    }

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &result)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &result)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
