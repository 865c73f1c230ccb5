//! # nbr-reduce: Node-Breaker to Bus-Branch Reduction
//!
//! Reduces a node-breaker network ([`nbr_core::NodeBreakerNetwork`]) to a
//! bus-branch model: terminals connected through negligible-impedance
//! equipment collapse into topological nodes, chains of AC line segments
//! sharing a common per-length impedance merge into single topological
//! branches, and the remaining equipment (transformers, sources, consumers,
//! power electronics) is re-attached to the collapsed nodes.
//!
//! The target model is caller-defined: implement [`BusBranchNetworkCreator`]
//! (and its paired [`BusBranchNetworkCreationValidator`]) and hand both to
//! [`create_bus_branch_network`]. The engine owns grouping, traversal order,
//! memoized node resolution and the bidirectional mapping registry; the
//! creator owns what a bus, branch or transformer looks like on the other
//! side.
//!
//! ## Failure model
//!
//! Structural problems in the input (wrong terminal counts) are fatal and
//! reported as [`ReductionError::InvalidNetwork`] listing every offender.
//! A `false` from any validator callback is a policy rejection, not an
//! error: the run stops, no partial network is returned, and the result
//! carries `was_successful == false`.

pub mod creator;
pub mod grouping;
pub mod mappings;
pub mod reducer;
mod resolver;
pub mod validate;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use creator::{BusBranchNetworkCreationValidator, BusBranchNetworkCreator};
pub use grouping::{
    default_negligible_impedance, group_common_ac_line_segment_terminals,
    group_negligible_impedance_terminals, TerminalGrouping,
};
pub use mappings::{NetworkCreationMappings, ToBusBranch, ToNodeBreaker};
pub use reducer::{create_bus_branch_network, CreationResult, ReductionError, ReductionResult};
pub use validate::validate_node_breaker_network;
