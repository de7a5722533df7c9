//! Saved-plan persistence.
//!
//! A plan file is everything needed to re-run the printers with a different
//! agent count without re-planning: the portals, the links with their build
//! order and annotations, the triangulation tree, and the time aggregates.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fieldplan_core::{Graph, Link, Portal, Triangle};

/// Extension a saved plan is expected to carry.
pub const PLAN_EXTENSION: &str = "json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub portals: Vec<Portal>,
    pub links: Vec<Link>,
    pub triangulation: Vec<Triangle>,
    pub walktime: f64,
    pub commtime: f64,
    pub linktime: f64,
}

impl PlanFile {
    pub fn from_graph(graph: &Graph) -> Self {
        Self {
            portals: graph.portals.clone(),
            links: graph.links.iter().cloned().collect(),
            triangulation: graph.triangulation.clone(),
            walktime: graph.walktime,
            commtime: graph.commtime,
            linktime: graph.linktime,
        }
    }

    pub fn into_graph(self) -> Graph {
        Graph::from_parts(
            self.portals,
            self.links,
            self.triangulation,
            self.walktime,
            self.commtime,
            self.linktime,
        )
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .with_context(|| format!("writing plan to {:?}", path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("reading plan from {:?}", path))
    }
}

/// Whether a path should be treated as a saved plan rather than a portal
/// list.
pub fn is_plan_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == PLAN_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_extension_detection() {
        assert!(is_plan_file(Path::new("out/lastPlan.json")));
        assert!(!is_plan_file(Path::new("portals.txt")));
        assert!(!is_plan_file(Path::new("lastPlan")));
    }
}
