//! Creator and validator contracts for the target bus-branch model.
//!
//! The engine never constructs bus-branch objects itself. A
//! [`BusBranchNetworkCreator`] supplies the target network type, mints
//! topological nodes and branches, and re-creates transformers and
//! injections against the collapsed nodes; its paired
//! [`BusBranchNetworkCreationValidator`] gets a veto over every piece of
//! data before the corresponding creator call.
//!
//! Creators return the ids they minted so the engine can register both
//! directions of the mapping registry. A validator returning `false`
//! anywhere stops the run; no partial network survives.

use crate::grouping::TerminalGrouping;
use nbr_core::{Equipment, Mrid, NodeBreakerNetwork, Volts};

/// Data veto hooks, invoked by the orchestrator before each creation.
///
/// Implementations may accumulate state (call counts, rejection reasons);
/// the final [`CreationResult`](crate::CreationResult) hands the validator
/// back to the caller.
pub trait BusBranchNetworkCreationValidator {
    type Network;

    /// Called once, before the target network is created.
    fn is_valid_network_data(&mut self, node_breaker_network: &NodeBreakerNetwork) -> bool;

    fn is_valid_topological_node_data(
        &mut self,
        bus_branch_network: &Self::Network,
        base_voltage: Option<Volts>,
        grouping: &TerminalGrouping,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    /// `connected_node_ids` holds the ids of the chain's two end nodes,
    /// ordered by feeder direction with mrid as tiebreak.
    fn is_valid_topological_branch_data(
        &mut self,
        bus_branch_network: &Self::Network,
        connected_node_ids: (&str, &str),
        length: f64,
        grouping: &TerminalGrouping,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    /// `connected_node_ids` carries one resolved node id per terminal of
    /// the branch; terminal counts on equivalent branches are not
    /// constrained by structural validation.
    fn is_valid_equivalent_branch_data(
        &mut self,
        bus_branch_network: &Self::Network,
        connected_node_ids: &[String],
        branch: &Equipment,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    /// `ends_to_node_ids` pairs each transformer end mrid with the id of the
    /// node its terminal resolved to, `None` for terminal-less ends.
    fn is_valid_power_transformer_data(
        &mut self,
        bus_branch_network: &Self::Network,
        transformer: &Equipment,
        ends_to_node_ids: &[(Mrid, Option<String>)],
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    fn is_valid_energy_source_data(
        &mut self,
        bus_branch_network: &Self::Network,
        source: &Equipment,
        node_id: &str,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    fn is_valid_energy_consumer_data(
        &mut self,
        bus_branch_network: &Self::Network,
        consumer: &Equipment,
        node_id: &str,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;

    fn is_valid_power_electronics_connection_data(
        &mut self,
        bus_branch_network: &Self::Network,
        connection: &Equipment,
        node_id: &str,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> bool;
}

/// Factory for the target bus-branch model.
///
/// `Node` is whatever the target model uses for a collapsed bus; the engine
/// clones it when several terminals resolve to the same node, so it should
/// be a handle or an id-carrying value rather than a heavy structure.
pub trait BusBranchNetworkCreator {
    type Network;
    type Node: Clone;
    type Validator: BusBranchNetworkCreationValidator<Network = Self::Network>;

    /// Fresh validator for one run.
    fn validator(&self) -> Self::Validator;

    /// Fresh, empty target network. Called exactly once per run.
    fn bus_branch_network_creator(&self, node_breaker_network: &NodeBreakerNetwork)
        -> Self::Network;

    /// Mints a topological node for a collapsed terminal group. Returns the
    /// id to register the node under, plus the node handle.
    fn topological_node_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        base_voltage: Option<Volts>,
        grouping: &TerminalGrouping,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> (String, Self::Node);

    /// Mints a topological branch for a merged line chain. Every chain in a
    /// structurally valid network ends at exactly two nodes (a dangling end
    /// resolves to a node of its own); `connected_nodes` follows the
    /// border-terminal order (feeder direction, then mrid) and `length` is
    /// the summed chain length.
    fn topological_branch_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        connected_nodes: (&Self::Node, &Self::Node),
        length: f64,
        grouping: &TerminalGrouping,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> String;

    /// `connected_nodes` carries the resolved node per terminal of the
    /// branch, sorted by feeder direction then mrid.
    fn equivalent_branch_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        connected_nodes: &[Self::Node],
        branch: &Equipment,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> String;

    /// May create several target objects for one transformer (for example a
    /// star expansion of a three-winding unit); returns every minted id.
    fn power_transformer_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        transformer: &Equipment,
        ends_to_nodes: &[(Mrid, Option<Self::Node>)],
        node_breaker_network: &NodeBreakerNetwork,
    ) -> Vec<String>;

    fn energy_source_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        source: &Equipment,
        node: &Self::Node,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> Vec<String>;

    fn energy_consumer_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        consumer: &Equipment,
        node: &Self::Node,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> Vec<String>;

    fn power_electronics_connection_creator(
        &self,
        bus_branch_network: &mut Self::Network,
        connection: &Equipment,
        node: &Self::Node,
        node_breaker_network: &NodeBreakerNetwork,
    ) -> Vec<String>;
}
