//! Memoized terminal-to-topological-node resolution.

use crate::creator::{BusBranchNetworkCreationValidator, BusBranchNetworkCreator};
use crate::grouping::group_negligible_impedance_terminals;
use crate::mappings::NetworkCreationMappings;
use nbr_core::{Mrid, NbrError, NbrResult, NodeBreakerNetwork, Volts};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Outcome of a resolution attempt. `Rejected` means the caller's validator
/// vetoed the node data and the whole run must stop.
pub(crate) enum Resolution<N> {
    Node(String, N),
    Rejected,
}

/// Resolves terminals to topological nodes, creating each node at most once.
/// Every terminal of a collapsed group memoizes to the same node.
pub(crate) struct TopologicalNodeResolver<'a, C, F>
where
    C: BusBranchNetworkCreator,
    F: Fn(&nbr_core::Equipment) -> bool,
{
    creator: &'a C,
    network: &'a NodeBreakerNetwork,
    has_negligible_impedance: &'a F,
    nodes_by_terminal: HashMap<Mrid, (String, C::Node)>,
}

impl<'a, C, F> TopologicalNodeResolver<'a, C, F>
where
    C: BusBranchNetworkCreator,
    F: Fn(&nbr_core::Equipment) -> bool,
{
    pub(crate) fn new(
        creator: &'a C,
        network: &'a NodeBreakerNetwork,
        has_negligible_impedance: &'a F,
    ) -> Self {
        TopologicalNodeResolver {
            creator,
            network,
            has_negligible_impedance,
            nodes_by_terminal: HashMap::new(),
        }
    }

    pub(crate) fn resolve(
        &mut self,
        terminal: &Mrid,
        bus_branch_network: &mut C::Network,
        validator: &mut C::Validator,
        mappings: &mut NetworkCreationMappings,
    ) -> NbrResult<Resolution<C::Node>> {
        if let Some((id, node)) = self.nodes_by_terminal.get(terminal) {
            return Ok(Resolution::Node(id.clone(), node.clone()));
        }

        let grouping = group_negligible_impedance_terminals(
            terminal,
            self.network,
            self.has_negligible_impedance,
        )?;
        let base_voltage = self.derive_base_voltage(&grouping.border_terminals)?;

        if !validator.is_valid_topological_node_data(
            bus_branch_network,
            base_voltage,
            &grouping,
            self.network,
        ) {
            return Ok(Resolution::Rejected);
        }

        let (id, node) = self.creator.topological_node_creator(
            bus_branch_network,
            base_voltage,
            &grouping,
            self.network,
        );
        trace!(node = %id, terminals = grouping.terminals().count(), "resolved topological node");

        for t_mrid in grouping.terminals() {
            mappings.to_bbn.record(t_mrid, &id);
            let t = self
                .network
                .terminal(t_mrid)
                .ok_or_else(|| NbrError::Model(format!("unknown terminal {t_mrid}")))?;
            if let Some(cn) = &t.connectivity_node {
                mappings.to_bbn.record(cn, &id);
            }
            self.nodes_by_terminal
                .insert(t_mrid.clone(), (id.clone(), node.clone()));
        }
        for eq_mrid in &grouping.conducting_equipment_group {
            mappings.to_bbn.record(eq_mrid, &id);
        }
        mappings
            .to_nbn
            .topological_nodes
            .insert(id.clone(), grouping);

        Ok(Resolution::Node(id, node))
    }

    /// Candidate base voltages come from the border equipment: a transformer
    /// contributes the rated voltage of the end bound to the border terminal,
    /// switches contribute nothing, everything else its assigned base
    /// voltage. When candidates disagree an arbitrary one wins.
    fn derive_base_voltage(&self, border_terminals: &HashSet<Mrid>) -> NbrResult<Option<Volts>> {
        let mut candidates: HashSet<Volts> = HashSet::new();
        for t_mrid in border_terminals {
            let terminal = self
                .network
                .terminal(t_mrid)
                .ok_or_else(|| NbrError::Model(format!("unknown terminal {t_mrid}")))?;
            let equipment = self
                .network
                .equipment_by_mrid(&terminal.equipment)
                .ok_or_else(|| NbrError::Model(format!("unknown equipment {}", terminal.equipment)))?;
            if equipment.is_switch() {
                continue;
            }
            if let Some(pt) = equipment.as_transformer() {
                if let Some(end) = pt.end_for_terminal(t_mrid) {
                    candidates.insert(end.rated_u);
                }
            } else if let Some(bv_mrid) = &equipment.base_voltage {
                let bv = self
                    .network
                    .base_voltage(bv_mrid)
                    .ok_or_else(|| NbrError::Model(format!("unknown base voltage {bv_mrid}")))?;
                candidates.insert(bv.nominal_voltage);
            }
        }
        Ok(candidates.into_iter().next())
    }
}
