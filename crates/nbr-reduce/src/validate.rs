//! Structural validation of the node-breaker input.
//!
//! Checks run over the whole network and collect every offender before
//! anything is reported, so one pass surfaces all problems.

use nbr_core::{Diagnostics, Equipment, NodeBreakerNetwork};

const CATEGORY: &str = "terminals";

fn check_terminal_count(diagnostics: &mut Diagnostics, equipment: &Equipment, expected: usize) {
    let actual = equipment.terminals.len();
    if actual != expected {
        diagnostics.add_error_for(
            CATEGORY,
            equipment.mrid.clone(),
            format!(
                "{} {} has {} terminals, expected {}",
                equipment.kind_name(),
                equipment.mrid,
                actual,
                expected
            ),
        );
    }
}

/// Validates the terminal-count rules the reduction relies on:
/// AC line segments carry exactly 2 terminals; energy sources, energy
/// consumers and power electronics connections carry exactly 1.
pub fn validate_node_breaker_network(network: &NodeBreakerNetwork) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for equipment in network.ac_line_segments() {
        check_terminal_count(&mut diagnostics, equipment, 2);
    }
    for equipment in network
        .energy_sources()
        .chain(network.energy_consumers())
        .chain(network.power_electronics_connections())
    {
        check_terminal_count(&mut diagnostics, equipment, 1);
    }
    diagnostics
}
