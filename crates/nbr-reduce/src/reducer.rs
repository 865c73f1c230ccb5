//! Phase orchestrator: drives a creator/validator pair over a validated
//! node-breaker network in a fixed order.
//!
//! Phase order: structural validation, network data check, topological
//! branches (which resolve their topological nodes on demand), equivalent
//! branches, power transformers, energy sources, energy consumers, power
//! electronics connections. Each phase only runs when everything before it
//! passed.

use crate::creator::{BusBranchNetworkCreationValidator, BusBranchNetworkCreator};
use crate::grouping::group_common_ac_line_segment_terminals;
use crate::mappings::NetworkCreationMappings;
use crate::resolver::{Resolution, TopologicalNodeResolver};
use crate::validate::validate_node_breaker_network;
use nbr_core::{DiagnosticIssue, Equipment, Mrid, NbrError, NodeBreakerNetwork};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

fn format_issues(issues: &[DiagnosticIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fatal reduction failures. Policy rejections by the caller's validator are
/// not errors; they surface as `was_successful == false` on the result.
#[derive(Error, Debug)]
pub enum ReductionError {
    /// The input broke a structural rule. Every offender is listed.
    #[error("invalid node-breaker network:\n{}", format_issues(issues))]
    InvalidNetwork { issues: Vec<DiagnosticIssue> },

    /// Dangling reference or other model-level inconsistency.
    #[error(transparent)]
    Model(#[from] NbrError),
}

pub type ReductionResult<T> = Result<T, ReductionError>;

/// Outcome of one reduction run. The validator is handed back so callers can
/// inspect whatever state it accumulated; the mappings cover everything
/// registered before the run finished or was rejected.
#[derive(Debug)]
pub struct CreationResult<N, V> {
    pub validator: V,
    pub mappings: NetworkCreationMappings,
    pub network: Option<N>,
    pub was_successful: bool,
}

impl<N, V> CreationResult<N, V> {
    fn rejected(validator: V, mappings: NetworkCreationMappings) -> Self {
        CreationResult {
            validator,
            mappings,
            network: None,
            was_successful: false,
        }
    }
}

/// Terminals ordered by feeder direction, mrid as tiebreak.
fn sorted_terminals<'a>(
    network: &NodeBreakerNetwork,
    terminals: impl IntoIterator<Item = &'a Mrid>,
) -> ReductionResult<Vec<Mrid>> {
    let mut keyed: Vec<(u8, Mrid)> = Vec::new();
    for mrid in terminals {
        let terminal = network
            .terminal(mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown terminal {mrid}")))?;
        keyed.push((terminal.feeder_direction.ordinal(), mrid.clone()));
    }
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, mrid)| mrid).collect())
}

fn single_terminal<'a>(equipment: &'a Equipment) -> ReductionResult<&'a Mrid> {
    equipment.terminals.first().ok_or_else(|| {
        NbrError::Model(format!(
            "{} {} has no terminal",
            equipment.kind_name(),
            equipment.mrid
        ))
        .into()
    })
}

/// Reduces `network` to a bus-branch model through `creator`.
///
/// `has_negligible_impedance` decides which equipment collapses into
/// topological nodes; [`crate::default_negligible_impedance`] is the usual
/// choice.
pub fn create_bus_branch_network<C, F>(
    network: &NodeBreakerNetwork,
    creator: &C,
    has_negligible_impedance: F,
) -> ReductionResult<CreationResult<C::Network, C::Validator>>
where
    C: BusBranchNetworkCreator,
    F: Fn(&Equipment) -> bool,
{
    let diagnostics = validate_node_breaker_network(network);
    if diagnostics.has_errors() {
        return Err(ReductionError::InvalidNetwork {
            issues: diagnostics.errors().cloned().collect(),
        });
    }

    let mut validator = creator.validator();
    let mut mappings = NetworkCreationMappings::new();

    if !validator.is_valid_network_data(network) {
        debug!("network data rejected by validator");
        return Ok(CreationResult::rejected(validator, mappings));
    }
    let mut bbn = creator.bus_branch_network_creator(network);
    let mut resolver = TopologicalNodeResolver::new(creator, network, &has_negligible_impedance);

    macro_rules! resolve_node {
        ($terminal:expr) => {
            match resolver.resolve($terminal, &mut bbn, &mut validator, &mut mappings)? {
                Resolution::Node(id, node) => (id, node),
                Resolution::Rejected => {
                    debug!(terminal = %$terminal, "topological node rejected by validator");
                    return Ok(CreationResult::rejected(validator, mappings));
                }
            }
        };
    }

    // Topological branches. Negligible (zero-length) segments are left to be
    // absorbed by node resolution.
    debug!("creating topological branches");
    let mut processed: HashSet<Mrid> = HashSet::new();
    let line_mrids: Vec<Mrid> = network.ac_line_segments().map(|e| e.mrid.clone()).collect();
    for mrid in line_mrids {
        if processed.contains(&mrid) {
            continue;
        }
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;
        if has_negligible_impedance(equipment) {
            continue;
        }
        let grouping = group_common_ac_line_segment_terminals(&mrid, network)?;

        let mut node_ids = Vec::new();
        let mut nodes = Vec::new();
        for border in sorted_terminals(network, &grouping.border_terminals)? {
            let (id, node) = resolve_node!(&border);
            node_ids.push(id);
            nodes.push(node);
        }
        // Every chain in a validated network ends at two nodes; anything else
        // (a closed ring of same-impedance segments) has no branch rendering.
        let ([id_a, id_b], [node_a, node_b]) = (node_ids.as_slice(), nodes.as_slice()) else {
            return Err(NbrError::Model(format!(
                "line chain at {mrid} resolves to {} topological nodes, expected 2",
                node_ids.len()
            ))
            .into());
        };

        let mut length = 0.0;
        for segment in &grouping.conducting_equipment_group {
            let line = network
                .equipment_by_mrid(segment)
                .and_then(|e| e.as_line())
                .ok_or_else(|| NbrError::Model(format!("{segment} is not an AcLineSegment")))?;
            length += line.length;
        }

        if !validator.is_valid_topological_branch_data(
            &bbn,
            (id_a.as_str(), id_b.as_str()),
            length,
            &grouping,
            network,
        ) {
            debug!(segment = %mrid, "topological branch rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let id =
            creator.topological_branch_creator(&mut bbn, (node_a, node_b), length, &grouping, network);

        for segment in &grouping.conducting_equipment_group {
            mappings.to_bbn.record(segment, &id);
            processed.insert(segment.clone());
        }
        for t_mrid in &grouping.inner_terminals {
            mappings.to_bbn.record(t_mrid, &id);
            let terminal = network
                .terminal(t_mrid)
                .ok_or_else(|| NbrError::Model(format!("unknown terminal {t_mrid}")))?;
            if let Some(cn) = &terminal.connectivity_node {
                mappings.to_bbn.record(cn, &id);
            }
        }
        mappings.to_nbn.topological_branches.insert(id, grouping);
    }

    // Equivalent branches. Ones already absorbed into a node are skipped;
    // negligible ones get their nodes resolved but no branch of their own.
    debug!("creating equivalent branches");
    let eb_mrids: Vec<Mrid> = network
        .equivalent_branches()
        .map(|e| e.mrid.clone())
        .collect();
    for mrid in eb_mrids {
        if mappings.was_processed(&mrid) {
            continue;
        }
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;

        let mut node_ids = Vec::new();
        let mut nodes = Vec::new();
        for terminal in sorted_terminals(network, &equipment.terminals)? {
            let (id, node) = resolve_node!(&terminal);
            node_ids.push(id);
            nodes.push(node);
        }

        let branch = equipment
            .as_equivalent_branch()
            .ok_or_else(|| NbrError::Model(format!("{mrid} is not an EquivalentBranch")))?;
        if branch.has_negligible_impedance() {
            continue;
        }

        if !validator.is_valid_equivalent_branch_data(&bbn, &node_ids, equipment, network) {
            debug!(branch = %mrid, "equivalent branch rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let id = creator.equivalent_branch_creator(&mut bbn, &nodes, equipment, network);
        mappings.to_bbn.record(&mrid, &id);
        mappings
            .to_nbn
            .equivalent_branches
            .entry(id)
            .or_default()
            .insert(mrid);
    }

    // Power transformers: each end pairs with the node its terminal resolves
    // to; terminal-less ends sort last and pair with nothing.
    debug!("creating power transformers");
    let pt_mrids: Vec<Mrid> = network
        .power_transformers()
        .map(|e| e.mrid.clone())
        .collect();
    for mrid in pt_mrids {
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;
        let transformer = equipment
            .as_transformer()
            .ok_or_else(|| NbrError::Model(format!("{mrid} is not a PowerTransformer")))?;

        let mut keyed_ends: Vec<(u8, Mrid, Option<Mrid>)> = Vec::new();
        for end in &transformer.ends {
            let ordinal = match &end.terminal {
                Some(t) => network
                    .terminal(t)
                    .ok_or_else(|| NbrError::Model(format!("unknown terminal {t}")))?
                    .feeder_direction
                    .ordinal(),
                None => u8::MAX,
            };
            keyed_ends.push((ordinal, end.mrid.clone(), end.terminal.clone()));
        }
        keyed_ends.sort();

        let mut ends_to_node_ids = Vec::new();
        let mut ends_to_nodes = Vec::new();
        for (_, end_mrid, terminal) in keyed_ends {
            match terminal {
                Some(t) => {
                    let (id, node) = resolve_node!(&t);
                    ends_to_node_ids.push((end_mrid.clone(), Some(id)));
                    ends_to_nodes.push((end_mrid, Some(node)));
                }
                None => {
                    ends_to_node_ids.push((end_mrid.clone(), None));
                    ends_to_nodes.push((end_mrid, None));
                }
            }
        }

        if !validator.is_valid_power_transformer_data(&bbn, equipment, &ends_to_node_ids, network)
        {
            debug!(transformer = %mrid, "power transformer rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let ids = creator.power_transformer_creator(&mut bbn, equipment, &ends_to_nodes, network);
        for id in ids {
            mappings.to_bbn.record(&mrid, &id);
            mappings
                .to_nbn
                .power_transformers
                .entry(id)
                .or_default()
                .insert(mrid.clone());
        }
    }

    // Single-terminal injections, one kind at a time.
    debug!("creating energy sources");
    let es_mrids: Vec<Mrid> = network.energy_sources().map(|e| e.mrid.clone()).collect();
    for mrid in es_mrids {
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;
        let terminal = single_terminal(equipment)?;
        let (node_id, node) = resolve_node!(terminal);
        if !validator.is_valid_energy_source_data(&bbn, equipment, &node_id, network) {
            debug!(source = %mrid, "energy source rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let ids = creator.energy_source_creator(&mut bbn, equipment, &node, network);
        for id in ids {
            mappings.to_bbn.record(&mrid, &id);
            mappings
                .to_nbn
                .energy_sources
                .entry(id)
                .or_default()
                .insert(mrid.clone());
        }
    }

    debug!("creating energy consumers");
    let ec_mrids: Vec<Mrid> = network.energy_consumers().map(|e| e.mrid.clone()).collect();
    for mrid in ec_mrids {
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;
        let terminal = single_terminal(equipment)?;
        let (node_id, node) = resolve_node!(terminal);
        if !validator.is_valid_energy_consumer_data(&bbn, equipment, &node_id, network) {
            debug!(consumer = %mrid, "energy consumer rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let ids = creator.energy_consumer_creator(&mut bbn, equipment, &node, network);
        for id in ids {
            mappings.to_bbn.record(&mrid, &id);
            mappings
                .to_nbn
                .energy_consumers
                .entry(id)
                .or_default()
                .insert(mrid.clone());
        }
    }

    debug!("creating power electronics connections");
    let pec_mrids: Vec<Mrid> = network
        .power_electronics_connections()
        .map(|e| e.mrid.clone())
        .collect();
    for mrid in pec_mrids {
        let equipment = network
            .equipment_by_mrid(&mrid)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))?;
        let terminal = single_terminal(equipment)?;
        let (node_id, node) = resolve_node!(terminal);
        if !validator.is_valid_power_electronics_connection_data(&bbn, equipment, &node_id, network)
        {
            debug!(connection = %mrid, "power electronics connection rejected by validator");
            return Ok(CreationResult::rejected(validator, mappings));
        }
        let ids = creator.power_electronics_connection_creator(&mut bbn, equipment, &node, network);
        for id in ids {
            mappings.to_bbn.record(&mrid, &id);
            mappings
                .to_nbn
                .power_electronics_connections
                .entry(id)
                .or_default()
                .insert(mrid.clone());
        }
    }

    info!(
        topological_nodes = mappings.to_nbn.topological_nodes.len(),
        topological_branches = mappings.to_nbn.topological_branches.len(),
        "reduction complete"
    );
    Ok(CreationResult {
        validator,
        mappings,
        network: Some(bbn),
        was_successful: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creator::{BusBranchNetworkCreationValidator, BusBranchNetworkCreator};
    use crate::fixtures;
    use crate::grouping::{default_negligible_impedance, TerminalGrouping};
    use nbr_core::{AcLineSegment, EquipmentKind, Injection, Volts};
    use std::collections::HashMap;

    /// Minimal target model: enough state to mint unique ids and remember
    /// what was created.
    #[derive(Debug, Default)]
    struct TestNetwork {
        nodes: Vec<(String, Option<Volts>)>,
        branches: Vec<(String, Vec<String>, f64)>,
        objects: Vec<String>,
    }

    #[derive(Debug, Default)]
    struct CountingValidator {
        counts: HashMap<&'static str, usize>,
        reject: Option<&'static str>,
    }

    impl CountingValidator {
        fn check(&mut self, stage: &'static str) -> bool {
            *self.counts.entry(stage).or_insert(0) += 1;
            self.reject != Some(stage)
        }

        fn count(&self, stage: &str) -> usize {
            self.counts.get(stage).copied().unwrap_or(0)
        }
    }

    impl BusBranchNetworkCreationValidator for CountingValidator {
        type Network = TestNetwork;

        fn is_valid_network_data(&mut self, _nbn: &NodeBreakerNetwork) -> bool {
            self.check("network")
        }

        fn is_valid_topological_node_data(
            &mut self,
            _bbn: &TestNetwork,
            _base_voltage: Option<Volts>,
            _grouping: &TerminalGrouping,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("topological_node")
        }

        fn is_valid_topological_branch_data(
            &mut self,
            _bbn: &TestNetwork,
            _connected_node_ids: (&str, &str),
            _length: f64,
            _grouping: &TerminalGrouping,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("topological_branch")
        }

        fn is_valid_equivalent_branch_data(
            &mut self,
            _bbn: &TestNetwork,
            _connected_node_ids: &[String],
            _branch: &Equipment,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("equivalent_branch")
        }

        fn is_valid_power_transformer_data(
            &mut self,
            _bbn: &TestNetwork,
            _transformer: &Equipment,
            _ends_to_node_ids: &[(Mrid, Option<String>)],
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("power_transformer")
        }

        fn is_valid_energy_source_data(
            &mut self,
            _bbn: &TestNetwork,
            _source: &Equipment,
            _node_id: &str,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("energy_source")
        }

        fn is_valid_energy_consumer_data(
            &mut self,
            _bbn: &TestNetwork,
            _consumer: &Equipment,
            _node_id: &str,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("energy_consumer")
        }

        fn is_valid_power_electronics_connection_data(
            &mut self,
            _bbn: &TestNetwork,
            _connection: &Equipment,
            _node_id: &str,
            _nbn: &NodeBreakerNetwork,
        ) -> bool {
            self.check("power_electronics_connection")
        }
    }

    #[derive(Debug, Default)]
    struct TestCreator {
        reject: Option<&'static str>,
    }

    impl TestCreator {
        fn rejecting(stage: &'static str) -> Self {
            TestCreator {
                reject: Some(stage),
            }
        }
    }

    impl BusBranchNetworkCreator for TestCreator {
        type Network = TestNetwork;
        type Node = String;
        type Validator = CountingValidator;

        fn validator(&self) -> CountingValidator {
            CountingValidator {
                counts: HashMap::new(),
                reject: self.reject,
            }
        }

        fn bus_branch_network_creator(&self, _nbn: &NodeBreakerNetwork) -> TestNetwork {
            TestNetwork::default()
        }

        fn topological_node_creator(
            &self,
            bbn: &mut TestNetwork,
            base_voltage: Option<Volts>,
            _grouping: &TerminalGrouping,
            _nbn: &NodeBreakerNetwork,
        ) -> (String, String) {
            let id = format!("tn{}", bbn.nodes.len());
            bbn.nodes.push((id.clone(), base_voltage));
            (id.clone(), id)
        }

        fn topological_branch_creator(
            &self,
            bbn: &mut TestNetwork,
            connected_nodes: (&String, &String),
            length: f64,
            _grouping: &TerminalGrouping,
            _nbn: &NodeBreakerNetwork,
        ) -> String {
            let id = format!("tb{}", bbn.branches.len());
            bbn.branches.push((
                id.clone(),
                vec![connected_nodes.0.clone(), connected_nodes.1.clone()],
                length,
            ));
            id
        }

        fn equivalent_branch_creator(
            &self,
            bbn: &mut TestNetwork,
            _connected_nodes: &[String],
            branch: &Equipment,
            _nbn: &NodeBreakerNetwork,
        ) -> String {
            let id = format!("eb-{}", branch.mrid);
            bbn.objects.push(id.clone());
            id
        }

        fn power_transformer_creator(
            &self,
            bbn: &mut TestNetwork,
            transformer: &Equipment,
            _ends_to_nodes: &[(Mrid, Option<String>)],
            _nbn: &NodeBreakerNetwork,
        ) -> Vec<String> {
            let id = format!("pt-{}", transformer.mrid);
            bbn.objects.push(id.clone());
            vec![id]
        }

        fn energy_source_creator(
            &self,
            bbn: &mut TestNetwork,
            source: &Equipment,
            _node: &String,
            _nbn: &NodeBreakerNetwork,
        ) -> Vec<String> {
            let id = format!("es-{}", source.mrid);
            bbn.objects.push(id.clone());
            vec![id]
        }

        fn energy_consumer_creator(
            &self,
            bbn: &mut TestNetwork,
            consumer: &Equipment,
            _node: &String,
            _nbn: &NodeBreakerNetwork,
        ) -> Vec<String> {
            let id = format!("ec-{}", consumer.mrid);
            bbn.objects.push(id.clone());
            vec![id]
        }

        fn power_electronics_connection_creator(
            &self,
            bbn: &mut TestNetwork,
            connection: &Equipment,
            _node: &String,
            _nbn: &NodeBreakerNetwork,
        ) -> Vec<String> {
            let id = format!("pec-{}", connection.mrid);
            bbn.objects.push(id.clone());
            vec![id]
        }
    }

    fn reduce(
        network: &NodeBreakerNetwork,
        creator: &TestCreator,
    ) -> CreationResult<TestNetwork, CountingValidator> {
        create_bus_branch_network(network, creator, default_negligible_impedance).unwrap()
    }

    #[test]
    fn test_simple_network_validator_call_counts() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::default());
        assert!(result.was_successful);
        let validator = &result.validator;
        assert_eq!(validator.count("network"), 1);
        assert_eq!(validator.count("topological_node"), 3);
        assert_eq!(validator.count("topological_branch"), 1);
        assert_eq!(validator.count("equivalent_branch"), 0);
        assert_eq!(validator.count("power_transformer"), 1);
        assert_eq!(validator.count("energy_source"), 1);
        assert_eq!(validator.count("energy_consumer"), 1);
        assert_eq!(validator.count("power_electronics_connection"), 1);
    }

    #[test]
    fn test_simple_network_created_objects() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        assert_eq!(bbn.nodes.len(), 3);
        assert_eq!(bbn.branches.len(), 1);
        let (_, connected, length) = &bbn.branches[0];
        assert_eq!(connected.len(), 2);
        assert_eq!(*length, 100.0);
        // Base voltages derived per node: one 20 kV, two 400 V.
        let voltages: Vec<_> = bbn.nodes.iter().filter_map(|(_, v)| *v).collect();
        assert_eq!(voltages.iter().filter(|v| **v == Volts::new(20_000)).count(), 1);
        assert_eq!(voltages.iter().filter(|v| **v == Volts::new(400)).count(), 2);
    }

    #[test]
    fn test_simple_network_mapping_completeness() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::default());
        for equipment in network.equipment() {
            assert!(
                result.mappings.was_processed(&equipment.mrid),
                "{} missing from mappings",
                equipment.mrid
            );
        }
        for terminal in network.terminals() {
            assert!(
                result.mappings.was_processed(&terminal.mrid),
                "{} missing from mappings",
                terminal.mrid
            );
        }
        for cn in network.connectivity_nodes() {
            assert!(result.mappings.was_processed(&cn.mrid));
        }
    }

    #[test]
    fn test_resolution_is_idempotent_across_terminals_of_a_node() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::default());
        // Both terminals on the source/transformer node resolve to one TN.
        let a = result.mappings.to_bbn.ids_for(&"grid_connection-t1".into());
        let b = result.mappings.to_bbn.ids_for(&"transformer-t1".into());
        assert_eq!(a, b);
        assert_eq!(a.unwrap().len(), 1);
    }

    #[test]
    fn test_three_common_lines_merge_into_one_branch() {
        let network = fixtures::three_common_lines_network();
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        assert_eq!(bbn.nodes.len(), 2);
        assert_eq!(bbn.branches.len(), 1);
        assert_eq!(bbn.branches[0].2, 60.0);

        let (tb_id, grouping) = result
            .mappings
            .to_nbn
            .topological_branches
            .iter()
            .next()
            .unwrap();
        assert_eq!(grouping.conducting_equipment_group.len(), 3);
        for line in ["acls1", "acls2", "acls3"] {
            assert!(result
                .mappings
                .to_bbn
                .ids_for(&line.into())
                .unwrap()
                .contains(tb_id));
        }
        // The junctions collapsed into the end nodes.
        assert!(result.mappings.was_processed(&"j1".into()));
        assert!(result.mappings.was_processed(&"j2".into()));
    }

    #[test]
    fn test_closed_switch_joins_chains_into_one_node() {
        let network = fixtures::single_branch_common_lines_network(false);
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        assert_eq!(bbn.branches.len(), 3);
        assert_eq!(bbn.nodes.len(), 4);
        // The merged chain's dangling far end resolves to a node of its own.
        let chain = bbn
            .branches
            .iter()
            .find(|(_, _, length)| *length == 6.0)
            .unwrap();
        assert_eq!(chain.1.len(), 2);
        assert_ne!(chain.1[0], chain.1[1]);
        assert!(result.mappings.was_processed(&"sw".into()));
    }

    #[test]
    fn test_open_switch_keeps_sides_apart() {
        let network = fixtures::single_branch_common_lines_network(true);
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        assert_eq!(bbn.branches.len(), 3);
        assert_eq!(bbn.nodes.len(), 5);
        // An open switch is never absorbed by a node.
        assert!(!result.mappings.was_processed(&"sw".into()));
    }

    #[test]
    fn test_zero_length_segments_absorbed_into_node() {
        let network = fixtures::negligible_impedance_equipment_basic_network(
            fixtures::NegligibleKind::Junction,
        );
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        assert_eq!(bbn.branches.len(), 3);
        assert_eq!(bbn.nodes.len(), 4);
        // a0, nie1 and a1 all collapsed into the same node.
        let a0 = result.mappings.to_bbn.ids_for(&"a0".into()).unwrap();
        assert_eq!(a0.len(), 1);
        assert_eq!(result.mappings.to_bbn.ids_for(&"nie1".into()), Some(a0));
        assert_eq!(result.mappings.to_bbn.ids_for(&"a1".into()), Some(a0));
        let tn_id = a0.iter().next().unwrap();
        assert!(result
            .mappings
            .to_nbn
            .topological_nodes
            .contains_key(tn_id));
    }

    #[test]
    fn test_multiple_injections_share_end_node() {
        let network = fixtures::end_of_branch_multiple_ec_pec();
        let result = reduce(&network, &TestCreator::default());
        assert_eq!(result.validator.count("energy_consumer"), 1);
        assert_eq!(result.validator.count("power_electronics_connection"), 2);
        let ec = result.mappings.to_bbn.ids_for(&"ec-t1".into());
        assert_eq!(ec, result.mappings.to_bbn.ids_for(&"pec1-t1".into()));
        assert_eq!(ec, result.mappings.to_bbn.ids_for(&"pec2-t1".into()));
        assert_eq!(
            result.mappings.to_nbn.power_electronics_connections.len(),
            2
        );
    }

    #[test]
    fn test_equivalent_branch_created_when_impedant() {
        let network = fixtures::equivalent_branch_network(false);
        let result = reduce(&network, &TestCreator::default());
        assert_eq!(result.validator.count("equivalent_branch"), 1);
        let ids = result.mappings.to_bbn.ids_for(&"eb".into()).unwrap();
        assert_eq!(ids.len(), 1);
        let id = ids.iter().next().unwrap();
        let absorbed: std::collections::HashSet<Mrid> = [Mrid::from("eb")].into_iter().collect();
        assert_eq!(result.mappings.to_nbn.equivalent_branches[id], absorbed);
        let bbn = result.network.unwrap();
        assert_eq!(bbn.branches.len(), 2);
        assert_eq!(bbn.nodes.len(), 4);
    }

    #[test]
    fn test_negligible_equivalent_branch_absorbed_not_created() {
        let network = fixtures::equivalent_branch_network(true);
        let result = reduce(&network, &TestCreator::default());
        assert_eq!(result.validator.count("equivalent_branch"), 0);
        assert!(result.mappings.to_nbn.equivalent_branches.is_empty());
        // Absorbed by the middle node during branch resolution.
        let eb = result.mappings.to_bbn.ids_for(&"eb".into()).unwrap();
        let tn_id = eb.iter().next().unwrap();
        assert!(result
            .mappings
            .to_nbn
            .topological_nodes
            .contains_key(tn_id));
        assert_eq!(result.network.unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_network_data_rejection_stops_before_creation() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::rejecting("network"));
        assert!(!result.was_successful);
        assert!(result.network.is_none());
        assert_eq!(result.validator.count("network"), 1);
        assert_eq!(result.validator.count("topological_node"), 0);
        assert!(result.mappings.to_bbn.objects.is_empty());
    }

    #[test]
    fn test_topological_node_rejection_returns_no_network() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::rejecting("topological_node"));
        assert!(!result.was_successful);
        assert!(result.network.is_none());
        assert_eq!(result.validator.count("topological_node"), 1);
        assert!(result.mappings.to_nbn.topological_nodes.is_empty());
    }

    #[test]
    fn test_energy_consumer_rejection_returns_no_network() {
        let network = fixtures::simple_node_breaker_network();
        let result = reduce(&network, &TestCreator::rejecting("energy_consumer"));
        assert!(!result.was_successful);
        assert!(result.network.is_none());
        // Earlier phases ran before the rejection landed.
        assert_eq!(result.validator.count("topological_branch"), 1);
        assert_eq!(result.validator.count("energy_consumer"), 1);
    }

    #[test]
    fn test_structural_failure_lists_every_offender() {
        let mut network = fixtures::simple_node_breaker_network();
        network.add_equipment(nbr_core::Equipment::new(
            "bad_line",
            EquipmentKind::AcLineSegment(AcLineSegment::new(1.0)),
        ));
        network.add_equipment(nbr_core::Equipment::new(
            "bad_source",
            EquipmentKind::EnergySource(Injection::new(0.0, 0.0)),
        ));
        network.create_terminals(&"bad_source".into(), 2).unwrap();
        let err = create_bus_branch_network(
            &network,
            &TestCreator::default(),
            default_negligible_impedance,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad_line"));
        assert!(message.contains("bad_source"));
        assert!(matches!(
            err,
            ReductionError::InvalidNetwork { issues } if issues.len() == 2
        ));
    }

    #[test]
    fn test_line_ring_without_ends_is_a_model_error() {
        // Two same-impedance segments joined at both ends form a ring with
        // no border terminals, which has no branch rendering.
        let mut network = NodeBreakerNetwork::new();
        network.add_per_length_sequence_impedance(
            nbr_core::PerLengthSequenceImpedance::new("plsi", 0.001, 0.002),
        );
        for mrid in ["s1", "s2"] {
            network.add_equipment(nbr_core::Equipment::new(
                mrid,
                EquipmentKind::AcLineSegment(AcLineSegment::new(1.0).with_impedance("plsi")),
            ));
            network.create_terminals(&mrid.into(), 2).unwrap();
        }
        network
            .connect_terminals(&"s1-t1".into(), &"s2-t1".into())
            .unwrap();
        network
            .connect_terminals(&"s1-t2".into(), &"s2-t2".into())
            .unwrap();
        let err = create_bus_branch_network(
            &network,
            &TestCreator::default(),
            default_negligible_impedance,
        )
        .unwrap_err();
        assert!(matches!(err, ReductionError::Model(_)));
        assert!(err.to_string().contains("expected 2"));
    }

    #[test]
    fn test_fork_produces_separate_branches() {
        let network = fixtures::multi_branch_common_lines_network();
        let result = reduce(&network, &TestCreator::default());
        let bbn = result.network.unwrap();
        // Chains: a0-a1-a2, a3, a4-a5, a6-a7, a8.
        assert_eq!(bbn.branches.len(), 5);
        assert_eq!(result.mappings.to_nbn.topological_branches.len(), 5);
    }
}
