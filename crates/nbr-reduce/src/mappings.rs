//! Bidirectional mapping registry between the node-breaker input and the
//! created bus-branch objects.
//!
//! Bus-branch objects are tracked by the id string their creator minted;
//! the forward direction answers "what did this mrid become", the reverse
//! direction answers "what collapsed into this bus-branch object".

use crate::grouping::TerminalGrouping;
use nbr_core::Mrid;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Forward direction: node-breaker mrid to the bus-branch ids it
/// participates in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToBusBranch {
    pub objects: HashMap<Mrid, HashSet<String>>,
}

impl ToBusBranch {
    pub fn record(&mut self, mrid: &Mrid, id: &str) {
        self.objects
            .entry(mrid.clone())
            .or_default()
            .insert(id.to_string());
    }

    pub fn ids_for(&self, mrid: &Mrid) -> Option<&HashSet<String>> {
        self.objects.get(mrid)
    }
}

/// Reverse direction: bus-branch id to the node-breaker objects it absorbed,
/// partitioned by the kind of bus-branch object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToNodeBreaker {
    pub topological_nodes: HashMap<String, TerminalGrouping>,
    pub topological_branches: HashMap<String, TerminalGrouping>,
    pub equivalent_branches: HashMap<String, HashSet<Mrid>>,
    pub power_transformers: HashMap<String, HashSet<Mrid>>,
    pub energy_sources: HashMap<String, HashSet<Mrid>>,
    pub energy_consumers: HashMap<String, HashSet<Mrid>>,
    pub power_electronics_connections: HashMap<String, HashSet<Mrid>>,
}

/// Both directions of the registry, accumulated while the orchestrator runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkCreationMappings {
    pub to_bbn: ToBusBranch,
    pub to_nbn: ToNodeBreaker,
}

impl NetworkCreationMappings {
    pub fn new() -> Self {
        NetworkCreationMappings::default()
    }

    /// True once the mrid has been registered against any bus-branch object.
    pub fn was_processed(&self, mrid: &Mrid) -> bool {
        self.to_bbn.objects.contains_key(mrid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let mut mappings = NetworkCreationMappings::new();
        let line = Mrid::from("acls1");
        assert!(!mappings.was_processed(&line));
        mappings.to_bbn.record(&line, "tb-1");
        assert!(mappings.was_processed(&line));
        assert!(mappings.to_bbn.ids_for(&line).unwrap().contains("tb-1"));
    }

    #[test]
    fn test_mappings_serialize() {
        let mut mappings = NetworkCreationMappings::new();
        mappings.to_bbn.record(&Mrid::from("acls1"), "tb-0");
        let json = serde_json::to_string(&mappings).unwrap();
        assert!(json.contains("acls1"));
        assert!(json.contains("tb-0"));
    }

    #[test]
    fn test_record_accumulates_ids() {
        let mut mappings = NetworkCreationMappings::new();
        let tx = Mrid::from("transformer");
        mappings.to_bbn.record(&tx, "pt-1");
        mappings.to_bbn.record(&tx, "pt-2");
        mappings.to_bbn.record(&tx, "pt-1");
        assert_eq!(mappings.to_bbn.ids_for(&tx).unwrap().len(), 2);
    }
}
