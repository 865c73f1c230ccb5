//! The reference creator: materializes the reduction into a
//! [`BusBranchNetwork`].
//!
//! Naming is deterministic: buses and branches take the smallest mrid of
//! what they collapsed. The paired [`PermissiveValidator`] accepts
//! everything; wrap or replace it to enforce policy.

use crate::{BusBranchNetwork, BusId};
use nbr_core::{Equipment, Mrid, NodeBreakerNetwork, Volts};
use nbr_reduce::{
    BusBranchNetworkCreationValidator, BusBranchNetworkCreator, TerminalGrouping,
};

/// Accepts every piece of data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl BusBranchNetworkCreationValidator for PermissiveValidator {
    type Network = BusBranchNetwork;

    fn is_valid_network_data(&mut self, _nbn: &NodeBreakerNetwork) -> bool {
        true
    }

    fn is_valid_topological_node_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _base_voltage: Option<Volts>,
        _grouping: &TerminalGrouping,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_topological_branch_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _connected_node_ids: (&str, &str),
        _length: f64,
        _grouping: &TerminalGrouping,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_equivalent_branch_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _connected_node_ids: &[String],
        _branch: &Equipment,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_power_transformer_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _transformer: &Equipment,
        _ends_to_node_ids: &[(Mrid, Option<String>)],
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_energy_source_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _source: &Equipment,
        _node_id: &str,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_energy_consumer_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _consumer: &Equipment,
        _node_id: &str,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }

    fn is_valid_power_electronics_connection_data(
        &mut self,
        _bbn: &BusBranchNetwork,
        _connection: &Equipment,
        _node_id: &str,
        _nbn: &NodeBreakerNetwork,
    ) -> bool {
        true
    }
}

/// Creator targeting [`BusBranchNetwork`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleBusBranchCreator;

fn smallest_mrid<'a>(mrids: impl Iterator<Item = &'a Mrid>) -> Option<&'a Mrid> {
    mrids.min()
}

fn grouping_name(grouping: &TerminalGrouping) -> String {
    smallest_mrid(grouping.conducting_equipment_group.iter())
        .or_else(|| smallest_mrid(grouping.border_terminals.iter()))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unnamed".to_string())
}

impl BusBranchNetworkCreator for SimpleBusBranchCreator {
    type Network = BusBranchNetwork;
    type Node = BusId;
    type Validator = PermissiveValidator;

    fn validator(&self) -> PermissiveValidator {
        PermissiveValidator
    }

    fn bus_branch_network_creator(&self, _nbn: &NodeBreakerNetwork) -> BusBranchNetwork {
        BusBranchNetwork::new()
    }

    fn topological_node_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        base_voltage: Option<Volts>,
        grouping: &TerminalGrouping,
        _nbn: &NodeBreakerNetwork,
    ) -> (String, BusId) {
        let bus = bbn.add_bus(grouping_name(grouping), base_voltage);
        (format!("tn-{}", bus.value()), bus)
    }

    fn topological_branch_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        connected_nodes: (&BusId, &BusId),
        length: f64,
        grouping: &TerminalGrouping,
        nbn: &NodeBreakerNetwork,
    ) -> String {
        // Per-length impedance is common across the chain; read it off the
        // smallest-mrid segment.
        let (mut r, mut x) = (0.0, 0.0);
        if let Some(plsi) = smallest_mrid(grouping.conducting_equipment_group.iter())
            .and_then(|mrid| nbn.equipment_by_mrid(mrid))
            .and_then(|eq| eq.as_line())
            .and_then(|line| line.per_length_sequence_impedance.as_ref())
            .and_then(|mrid| nbn.per_length_sequence_impedance(mrid))
        {
            r = plsi.r * length;
            x = plsi.x * length;
        }
        let (from, to) = (*connected_nodes.0, *connected_nodes.1);
        let branch = bbn.add_branch(grouping_name(grouping), from, to, r, x, length);
        match branch {
            Some(id) => format!("tb-{}", id.value()),
            None => "tb-unconnected".to_string(),
        }
    }

    fn equivalent_branch_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        connected_nodes: &[BusId],
        branch: &Equipment,
        _nbn: &NodeBreakerNetwork,
    ) -> String {
        let payload = branch.as_equivalent_branch();
        let r = payload.and_then(|eb| eb.r).unwrap_or(0.0);
        let x = payload.and_then(|eb| eb.x).unwrap_or(0.0);
        // Anything but a two-ended branch has no edge rendering.
        let [from, to] = connected_nodes else {
            return "eb-unconnected".to_string();
        };
        match bbn.add_branch(branch.mrid.as_str(), *from, *to, r, x, 0.0) {
            Some(id) => format!("eb-{}", id.value()),
            None => "eb-unconnected".to_string(),
        }
    }

    fn power_transformer_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        transformer: &Equipment,
        ends_to_nodes: &[(Mrid, Option<BusId>)],
        _nbn: &NodeBreakerNetwork,
    ) -> Vec<String> {
        let rated_u: Vec<Volts> = transformer
            .as_transformer()
            .map(|pt| pt.ends.iter().map(|end| end.rated_u).collect())
            .unwrap_or_default();
        let connected: Vec<BusId> = ends_to_nodes
            .iter()
            .filter_map(|(_, node)| *node)
            .collect();
        // One winding edge per adjacent pair; a three-winding unit becomes
        // two edges sharing the name.
        let mut ids = Vec::new();
        for pair in connected.windows(2) {
            if let Some(id) =
                bbn.add_transformer(transformer.mrid.as_str(), pair[0], pair[1], rated_u.clone())
            {
                ids.push(format!("pt-{}", id.value()));
            }
        }
        ids
    }

    fn energy_source_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        source: &Equipment,
        node: &BusId,
        _nbn: &NodeBreakerNetwork,
    ) -> Vec<String> {
        let injection = source.as_injection().copied().unwrap_or_default();
        match bbn.add_source(source.mrid.as_str(), *node, injection.p, injection.q) {
            Some(id) => vec![format!("source-{}", id.value())],
            None => Vec::new(),
        }
    }

    fn energy_consumer_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        consumer: &Equipment,
        node: &BusId,
        _nbn: &NodeBreakerNetwork,
    ) -> Vec<String> {
        let injection = consumer.as_injection().copied().unwrap_or_default();
        match bbn.add_load(consumer.mrid.as_str(), *node, injection.p, injection.q) {
            Some(id) => vec![format!("load-{}", id.value())],
            None => Vec::new(),
        }
    }

    fn power_electronics_connection_creator(
        &self,
        bbn: &mut BusBranchNetwork,
        connection: &Equipment,
        node: &BusId,
        _nbn: &NodeBreakerNetwork,
    ) -> Vec<String> {
        let injection = connection.as_injection().copied().unwrap_or_default();
        match bbn.add_inverter(connection.mrid.as_str(), *node, injection.p, injection.q) {
            Some(id) => vec![format!("inverter-{}", id.value())],
            None => Vec::new(),
        }
    }
}
