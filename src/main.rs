use anyhow::{Context, Result};
use env_logger::Builder;
use log::{LevelFilter, info};

use wifi_csma_simulator::common::scene::load_scene;
use wifi_csma_simulator::experiment::{Experiment, ExperimentConfig};

const DEFAULT_SCENE_PATH: &str = "scene.json";

fn main() -> Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("wifi_csma_simulator"), LevelFilter::Debug)
        .init();

    info!("Starting up");

    let scene_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCENE_PATH.to_string());
    let scene = load_scene(&scene_path).with_context(|| format!("Cannot load scene {}", scene_path))?;

    let config_path = ExperimentConfig::config_path_from_scene(&scene_path);
    let config = ExperimentConfig::load_or_default(&config_path).map_err(anyhow::Error::msg)?;
    info!("Results go to {}", config.output_dir.display());

    let mut experiment = Experiment::build(scene, config)?;
    let records = experiment.run()?;

    let delivered: u64 = records.iter().map(|r| r.report.total_consumed()).sum();
    info!("Experiment finished: {} runs, {} frames delivered", records.len(), delivered);
    Ok(())
}
