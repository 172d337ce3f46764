use anyhow::{Context, Result};
use calcium_common::init_tracer;
use clap::Parser;
use simulator::SimulationConfig;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};
use tracing::{info, level_filters::LevelFilter};

// cargo run --bin simulator -- --config simulation.json --output dataset.json

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON description of the simulated experiment.
    #[clap(long)]
    config: PathBuf,

    /// Where to write the dataset, stdout if absent.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Replaces the seed given in the description.
    #[clap(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let tracer = init_tracer!(LevelFilter::INFO);
    info!("Starting {}", tracer.service_name());

    let mut config: SimulationConfig = serde_json::from_reader(BufReader::new(
        File::open(&args.config)
            .with_context(|| format!("cannot open {}", args.config.display()))?,
    ))
    .with_context(|| format!("cannot parse simulation {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let dataset = config.generate()?;
    info!(
        "Simulated {} cells over {} samples",
        dataset.cells.len(),
        config.num_samples
    );

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(&mut writer, &dataset)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer(&mut stdout, &dataset)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
