//! Scene loading, parsing, and validation logic.
//!
//! A scene describes the topology of one experiment: every node with its
//! position and transmission radius, and the traffic each source produces.
//!
//! ```json
//! {
//!   "default_arrival": { "type": "exponential", "mean": 2000 },
//!   "nodes": [
//!     { "node_id": 0, "position": { "x": 0, "y": 0 }, "radius": 1.1,
//!       "traffic": { "destinations": [1], "max_messages": 10 } },
//!     { "node_id": 1, "position": { "x": 1, "y": 0 }, "radius": 1.1 }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use crate::simulation::types::Point;
use crate::simulation::variate::RandomVariate;

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Traffic produced by a source node.
#[derive(Debug, Deserialize)]
pub struct Traffic {
    /// `node_id`s the source picks its destinations from.
    pub destinations: Vec<u32>,
    /// Delay before the first frame; the scene's `default_arrival` when absent.
    #[serde(default)]
    pub arrival: Option<RandomVariate>,
    /// Falls back to the experiment's `max-messages`.
    #[serde(default)]
    pub max_messages: Option<u64>,
    /// Falls back to the experiment's `message-length`.
    #[serde(default)]
    pub message_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SceneNode {
    pub node_id: u32,
    #[serde(default)]
    pub name: Option<String>,
    pub position: Point,
    /// Transmission radius, in the same units as the positions.
    pub radius: f64,
    #[serde(default)]
    pub traffic: Option<Traffic>,
}

impl SceneNode {
    /// Explicit name, or `Node_<id>_[x,y]`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Node_{}_[{},{}]", self.node_id, self.position.x, self.position.y),
        }
    }
}

/// Root structure representing the entire scene.
#[derive(Debug, Deserialize)]
pub struct Scene {
    /// Arrival variate shared by every source without its own.
    #[serde(default)]
    pub default_arrival: Option<RandomVariate>,
    pub nodes: Vec<SceneNode>,
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    let scene = parse_scene(&data)?;
    log::info!("Loaded scene {} with {} nodes", path, scene.nodes.len());
    Ok(scene)
}

/// Parse and validate a scene from its JSON text.
pub fn parse_scene(data: &str) -> Result<Scene, SceneLoadError> {
    let scene: Scene = serde_json::from_str(data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(format!("{:#}", e)))?;

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;
    Ok(scene)
}

/// Validate scene configuration.
///
/// Checks for issues that would make the simulation fail at run time:
/// - Empty or oversized node lists
/// - Duplicate node IDs
/// - Non-finite positions or non-positive radii
/// - Sources without destinations, with unknown destinations or sending to themselves
/// - Sources without any arrival variate, or with invalid variate parameters
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with error description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_NODES: usize = 10000;

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() > MAX_NODES {
        return Err(format!("Node count {} exceeds maximum of {}", scene.nodes.len(), MAX_NODES));
    }

    let mut node_ids = HashSet::new();
    for node in &scene.nodes {
        if !node_ids.insert(node.node_id) {
            return Err(format!("Duplicate node_id found: {}", node.node_id));
        }
    }

    if let Some(default_arrival) = &scene.default_arrival {
        default_arrival.validate().map_err(|e| format!("default_arrival: {}", e))?;
    }

    for node in &scene.nodes {
        if !node.position.x.is_finite() || !node.position.y.is_finite() {
            return Err(format!("Node {} has a non-finite position", node.node_id));
        }
        if !(node.radius.is_finite() && node.radius > 0.0) {
            return Err(format!("Node {} radius {} must be positive", node.node_id, node.radius));
        }

        let Some(traffic) = &node.traffic else {
            continue;
        };
        if traffic.destinations.is_empty() {
            return Err(format!("Node {} traffic has no destinations", node.node_id));
        }
        for destination in &traffic.destinations {
            if *destination == node.node_id {
                return Err(format!("Node {} cannot send traffic to itself", node.node_id));
            }
            if !node_ids.contains(destination) {
                return Err(format!("Node {} traffic destination {} does not exist", node.node_id, destination));
            }
        }
        match (&traffic.arrival, &scene.default_arrival) {
            (Some(arrival), _) => arrival.validate().map_err(|e| format!("Node {} arrival: {}", node.node_id, e))?,
            (None, Some(_)) => {}
            (None, None) => return Err(format!("Node {} traffic has no arrival and the scene has no default_arrival", node.node_id)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = r#"{
        "default_arrival": { "type": "exponential", "mean": 2000 },
        "nodes": [
            { "node_id": 0, "position": { "x": 0, "y": 0 }, "radius": 1.1,
              "traffic": { "destinations": [1], "max_messages": 5 } },
            { "node_id": 1, "name": "sink", "position": { "x": 1, "y": 0 }, "radius": 1.1 }
        ]
    }"#;

    #[test]
    fn parses_a_valid_scene() {
        let scene = parse_scene(TWO_NODES).unwrap();
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.nodes[0].display_name(), "Node_0_[0,0]");
        assert_eq!(scene.nodes[1].display_name(), "sink");
        let traffic = scene.nodes[0].traffic.as_ref().unwrap();
        assert_eq!(traffic.max_messages, Some(5));
        assert!(traffic.arrival.is_none());
    }

    #[test]
    fn rejects_unknown_destination() {
        let data = TWO_NODES.replace("\"destinations\": [1]", "\"destinations\": [7]");
        match parse_scene(&data) {
            Err(SceneLoadError::ValidationError(msg)) => assert!(msg.contains("destination 7")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_duplicate_ids_and_bad_radius() {
        let duplicate = TWO_NODES.replace("\"node_id\": 1", "\"node_id\": 0");
        assert!(matches!(parse_scene(&duplicate), Err(SceneLoadError::ValidationError(_))));

        let bad_radius = TWO_NODES.replace("\"radius\": 1.1 }\n", "\"radius\": 0 }\n");
        assert!(matches!(parse_scene(&bad_radius), Err(SceneLoadError::ValidationError(_))));
    }

    #[test]
    fn source_needs_an_arrival() {
        let data = TWO_NODES.replace("\"default_arrival\": { \"type\": \"exponential\", \"mean\": 2000 },", "");
        assert!(matches!(parse_scene(&data), Err(SceneLoadError::ValidationError(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_scene("{ \"nodes\": ["), Err(SceneLoadError::ParseError(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(load_scene("/nonexistent/scene.json"), Err(SceneLoadError::FileReadError(_))));
    }
}
