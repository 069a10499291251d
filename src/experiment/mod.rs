//! Experiment orchestration.
//!
//! Builds a [`Network`] from a scene and sweeps the traffic period:
//! - One node, interface and medium per scene node, wired by distance
//! - For every period, `runs-per-period` runs of `simulation-length` ticks
//! - Per run: an optional status trace file and one JSON line in `stats/runs.jsonl`
//!
//! A run that fails is logged and skipped; the sweep goes on.

pub mod config;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::common::scene::Scene;
use crate::simulation::network::Network;
use crate::simulation::stats::RunReport;
use crate::simulation::trace::AsciiTrace;
use crate::simulation::types::NodeId;
use crate::simulation::variate::RandomVariate;

pub use config::ExperimentConfig;

/// One line of `stats/runs.jsonl`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub period: f64,
    pub run: u32,
    pub seed: u64,
    #[serde(flatten)]
    pub report: RunReport,
}

pub struct Experiment {
    network: Network,
    config: ExperimentConfig,
    sources: Vec<NodeId>,
}

impl Experiment {
    /// Create the network described by `scene`.
    ///
    /// Nodes without an explicit name are called `Node_<id>_[x,y]`, their
    /// interfaces `Interface_<node name>`.
    pub fn build(scene: Scene, config: ExperimentConfig) -> Result<Self> {
        let mut network = Network::new(config.mac, config.seed);
        let default_arrival = scene.default_arrival.map(Arc::new);
        let mut ids = HashMap::new();
        let mut sources = Vec::new();
        let mut pending = Vec::new();

        for scene_node in scene.nodes {
            let name = scene_node.display_name();
            let id = match scene_node.traffic {
                Some(traffic) => {
                    let arrival = match (traffic.arrival, &default_arrival) {
                        (Some(own), _) => Arc::new(own),
                        (None, Some(shared)) => Arc::clone(shared),
                        (None, None) => bail!("Node {} has traffic but no arrival variate", name),
                    };
                    let max_messages = traffic.max_messages.unwrap_or(config.max_messages);
                    let id = network.add_source(name.clone(), scene_node.position, arrival, max_messages);
                    network.set_message_length(id, traffic.message_length.unwrap_or(config.message_length))?;
                    sources.push(id);
                    pending.push((id, traffic.destinations));
                    id
                }
                None => network.add_node(name.clone(), scene_node.position),
            };
            network.add_interface(id, format!("Interface_{}", name), scene_node.radius);
            ids.insert(scene_node.node_id, id);
        }

        for (source, destinations) in pending {
            for destination in destinations {
                let target = *ids.get(&destination).with_context(|| format!("Unknown destination node_id {}", destination))?;
                network.add_destination(source, target)?;
            }
        }
        network.connect_in_range();

        log::info!("Built network with {} nodes ({} sources)", network.nodes().len(), sources.len());
        Ok(Self { network, config, sources })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run the whole sweep, writing traces and statistics under `output-dir`.
    ///
    /// # Returns
    ///
    /// The records of every run that completed.
    pub fn run(&mut self) -> Result<Vec<RunRecord>> {
        let output_dir = self.config.output_dir.clone();
        let stats_dir = output_dir.join("stats");
        fs::create_dir_all(&stats_dir).with_context(|| format!("Failed to create {}", stats_dir.display()))?;
        let traces_dir = output_dir.join("traces");
        if self.config.trace {
            fs::create_dir_all(&traces_dir).with_context(|| format!("Failed to create {}", traces_dir.display()))?;
        }

        let stats_path = stats_dir.join("runs.jsonl");
        let mut stats_file = BufWriter::new(File::create(&stats_path).with_context(|| format!("Failed to create {}", stats_path.display()))?);

        let periods = self.config.periods();
        log::info!("Sweeping {} periods x {} runs", periods.len(), self.config.runs_per_period);

        let mut records = Vec::new();
        let mut seed = self.config.seed;
        for period in periods {
            for run in 0..self.config.runs_per_period {
                let trace_dir = self.config.trace.then_some(traces_dir.as_path());
                match self.run_once(period, run, seed, trace_dir) {
                    Ok(record) => {
                        serde_json::to_writer(&mut stats_file, &record).context("Failed to write run statistics")?;
                        writeln!(stats_file).context("Failed to write run statistics")?;
                        records.push(record);
                    }
                    Err(err) => log::warn!("Run {} at period {} aborted: {:#}", run, period, err),
                }
                seed = seed.wrapping_add(1);
            }
        }
        stats_file.flush().context("Failed to flush run statistics")?;
        Ok(records)
    }

    /// Execute a single run with every source producing every `period` ticks.
    pub fn run_once(&mut self, period: f64, run: u32, seed: u64, trace_dir: Option<&Path>) -> Result<RunRecord> {
        let period_variate = Arc::new(RandomVariate::delta(period));
        for source in &self.sources {
            self.network.set_period(*source, Arc::clone(&period_variate))?;
        }
        self.network.reseed(seed);

        let trace = match trace_dir {
            Some(dir) => {
                let path = dir.join(format!("trace_n{}_p{}_r{}.txt", self.network.nodes().len(), period, run));
                let trace = AsciiTrace::create(&path).with_context(|| format!("Failed to create trace {}", path.display()))?;
                Some(Box::new(trace) as Box<dyn crate::simulation::trace::TraceSink>)
            }
            None => None,
        };
        self.network.set_trace(trace);

        log::info!("Starting run {} at period {} (seed {})", run, period, seed);
        let outcome = self
            .network
            .init_run()
            .and_then(|_| self.network.run_to(self.config.simulation_length));
        let report = self.network.end_run();
        self.network.set_trace(None);
        outcome.with_context(|| format!("Simulation failed at t={}", report.end_time))?;

        Ok(RunRecord { period, run, seed, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scene::parse_scene;

    const LINE: &str = r#"{
        "nodes": [
            { "node_id": 10, "position": { "x": 0, "y": 0 }, "radius": 1.1,
              "traffic": { "destinations": [30], "arrival": { "type": "delta", "value": 5 }, "max_messages": 2 } },
            { "node_id": 20, "position": { "x": 1, "y": 0 }, "radius": 1.1 },
            { "node_id": 30, "name": "sink", "position": { "x": 2, "y": 0 }, "radius": 1.1 }
        ]
    }"#;

    fn test_config(dir: &str) -> ExperimentConfig {
        ExperimentConfig {
            simulation_length: 20_000,
            period_min: 1000.0,
            period_max: 2000.0,
            period_step: 1000.0,
            runs_per_period: 2,
            trace: true,
            output_dir: std::env::temp_dir().join(format!("{}_{}", dir, std::process::id())),
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn build_names_nodes_and_wires_neighbours() {
        let experiment = Experiment::build(parse_scene(LINE).unwrap(), test_config("wifi_build")).unwrap();
        let network = experiment.network();
        assert_eq!(network.nodes()[0].name, "Node_10_[0,0]");
        assert_eq!(network.interfaces()[2].name, "Interface_sink");
        let first = network.interfaces()[0].medium;
        assert_eq!(network.medium(first).members().len(), 1);
        let middle = network.interfaces()[1].medium;
        assert_eq!(network.medium(middle).members().len(), 2);
    }

    #[test]
    fn sweep_writes_traces_and_statistics() {
        let config = test_config("wifi_sweep");
        let output_dir = config.output_dir.clone();
        let mut experiment = Experiment::build(parse_scene(LINE).unwrap(), config).unwrap();
        let records = experiment.run().unwrap();

        assert_eq!(records.len(), 4);
        for record in &records {
            assert_eq!(record.report.total_produced(), 2);
            assert_eq!(record.report.nodes[2].consumed, 2);
            assert_eq!(record.report.nodes[1].consumed, 0);
        }
        let stats = fs::read_to_string(output_dir.join("stats").join("runs.jsonl")).unwrap();
        assert_eq!(stats.lines().count(), 4);
        let first: serde_json::Value = serde_json::from_str(stats.lines().next().unwrap()).unwrap();
        assert_eq!(first["period"], 1000.0);
        assert!(first["counters"]["forwarded"].as_u64().unwrap() >= 2);
        assert!(output_dir.join("traces").join("trace_n3_p2000_r1.txt").exists());
        let _ = fs::remove_dir_all(&output_dir);
    }
}
