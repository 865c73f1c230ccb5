//! Terminal grouping: the two traversals that decide what collapses.
//!
//! [`group_negligible_impedance_terminals`] walks outward from a terminal
//! through connectivity nodes and through any equipment the caller's
//! predicate declares negligible; the walk's frontier terminals become the
//! border of a topological node, everything swallowed along the way becomes
//! inner.
//!
//! [`group_common_ac_line_segment_terminals`] walks chains of AC line
//! segments that share the same per-length sequence impedance through
//! plain 2-terminal connectivity nodes; a fork (3+ terminals) or an
//! impedance change ends the chain.

use nbr_core::{Equipment, EquipmentKind, Mrid, NbrError, NbrResult, NodeBreakerNetwork};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Result of a grouping traversal: the equipment swallowed by the group and
/// its terminals, partitioned into border (frontier) and inner (absorbed).
///
/// Invariant: `border_terminals` and `inner_terminals` are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalGrouping {
    pub conducting_equipment_group: HashSet<Mrid>,
    pub border_terminals: HashSet<Mrid>,
    pub inner_terminals: HashSet<Mrid>,
}

impl TerminalGrouping {
    pub fn new() -> Self {
        TerminalGrouping::default()
    }

    /// All grouped terminals, border and inner.
    pub fn terminals(&self) -> impl Iterator<Item = &Mrid> {
        self.border_terminals.iter().chain(self.inner_terminals.iter())
    }

    pub fn contains_terminal(&self, terminal: &Mrid) -> bool {
        self.border_terminals.contains(terminal) || self.inner_terminals.contains(terminal)
    }
}

/// Default negligible-impedance rule: closed switches, junctions, busbar
/// sections, zero-length lines and equivalent branches with missing or zero
/// r/x collapse; everything else keeps its identity.
pub fn default_negligible_impedance(equipment: &Equipment) -> bool {
    match &equipment.kind {
        EquipmentKind::Switch(sw) => !sw.open,
        EquipmentKind::Junction | EquipmentKind::BusbarSection => true,
        EquipmentKind::AcLineSegment(line) => line.length == 0.0,
        EquipmentKind::EquivalentBranch(eb) => eb.has_negligible_impedance(),
        _ => false,
    }
}

fn terminal_of<'a>(network: &'a NodeBreakerNetwork, mrid: &Mrid) -> NbrResult<&'a nbr_core::Terminal> {
    network
        .terminal(mrid)
        .ok_or_else(|| NbrError::Model(format!("unknown terminal {mrid}")))
}

fn equipment_of<'a>(network: &'a NodeBreakerNetwork, mrid: &Mrid) -> NbrResult<&'a Equipment> {
    network
        .equipment_by_mrid(mrid)
        .ok_or_else(|| NbrError::Model(format!("unknown equipment {mrid}")))
}

/// Collects the terminals reachable from `start` through connectivity nodes
/// and through equipment for which `has_negligible_impedance` returns true.
///
/// Terminals of negligible equipment land in `inner_terminals` and the
/// equipment joins the group; terminals of anything else land in
/// `border_terminals` and the walk stops there (their connectivity node is
/// still explored, so parallel siblings on the starting node are found).
pub fn group_negligible_impedance_terminals(
    start: &Mrid,
    network: &NodeBreakerNetwork,
    has_negligible_impedance: &dyn Fn(&Equipment) -> bool,
) -> NbrResult<TerminalGrouping> {
    let mut grouping = TerminalGrouping::new();
    let mut visited: HashSet<Mrid> = HashSet::new();
    let mut frontier: VecDeque<Mrid> = VecDeque::new();
    frontier.push_back(start.clone());

    while let Some(mrid) = frontier.pop_front() {
        if !visited.insert(mrid.clone()) {
            continue;
        }
        let terminal = terminal_of(network, &mrid)?;
        let equipment = equipment_of(network, &terminal.equipment)?;

        if has_negligible_impedance(equipment) {
            grouping
                .conducting_equipment_group
                .insert(equipment.mrid.clone());
            grouping.inner_terminals.insert(mrid.clone());
            for other in &equipment.terminals {
                if other != &mrid {
                    frontier.push_back(other.clone());
                }
            }
        } else {
            grouping.border_terminals.insert(mrid.clone());
        }

        if let Some(cn_mrid) = &terminal.connectivity_node {
            let cn = network
                .connectivity_node(cn_mrid)
                .ok_or_else(|| NbrError::Model(format!("unknown connectivity node {cn_mrid}")))?;
            for other in &cn.terminals {
                if other != &mrid {
                    frontier.push_back(other.clone());
                }
            }
        }
    }

    Ok(grouping)
}

/// Collects the chain of AC line segments sharing `start`'s per-length
/// sequence impedance, reachable through connectivity nodes with exactly two
/// terminals. Returns the chain as a grouping: a terminal is inner when its
/// connectivity node joins two grouped terminals, border otherwise.
pub fn group_common_ac_line_segment_terminals(
    start: &Mrid,
    network: &NodeBreakerNetwork,
) -> NbrResult<TerminalGrouping> {
    let start_eq = equipment_of(network, start)?;
    let line = start_eq
        .as_line()
        .ok_or_else(|| NbrError::Model(format!("{start} is not an AcLineSegment")))?;
    let impedance = line.per_length_sequence_impedance.clone();

    let mut grouped: HashSet<Mrid> = HashSet::new();
    let mut frontier: VecDeque<Mrid> = VecDeque::new();
    frontier.push_back(start.clone());

    while let Some(mrid) = frontier.pop_front() {
        if !grouped.insert(mrid.clone()) {
            continue;
        }
        let equipment = equipment_of(network, &mrid)?;
        for t_mrid in &equipment.terminals {
            let terminal = terminal_of(network, t_mrid)?;
            let Some(cn_mrid) = &terminal.connectivity_node else {
                continue;
            };
            let cn = network
                .connectivity_node(cn_mrid)
                .ok_or_else(|| NbrError::Model(format!("unknown connectivity node {cn_mrid}")))?;
            // A forking node ends the chain.
            if cn.terminals.len() > 2 {
                continue;
            }
            for other in &cn.terminals {
                if other == t_mrid {
                    continue;
                }
                let other_eq = equipment_of(network, &terminal_of(network, other)?.equipment)?;
                let same_impedance = other_eq
                    .as_line()
                    .map(|l| l.per_length_sequence_impedance == impedance)
                    .unwrap_or(false);
                if same_impedance && !grouped.contains(&other_eq.mrid) {
                    frontier.push_back(other_eq.mrid.clone());
                }
            }
        }
    }

    // Border/inner classification: count grouped terminals per node.
    let mut grouping = TerminalGrouping::new();
    let mut per_node: HashMap<Mrid, usize> = HashMap::new();
    let mut terminals: Vec<(Mrid, Option<Mrid>)> = Vec::new();
    for eq_mrid in &grouped {
        let equipment = equipment_of(network, eq_mrid)?;
        for t_mrid in &equipment.terminals {
            let terminal = terminal_of(network, t_mrid)?;
            if let Some(cn) = &terminal.connectivity_node {
                *per_node.entry(cn.clone()).or_insert(0) += 1;
            }
            terminals.push((t_mrid.clone(), terminal.connectivity_node.clone()));
        }
    }
    for (t_mrid, cn) in terminals {
        let inner = cn.map(|cn| per_node[&cn] >= 2).unwrap_or(false);
        if inner {
            grouping.inner_terminals.insert(t_mrid);
        } else {
            grouping.border_terminals.insert(t_mrid);
        }
    }
    grouping.conducting_equipment_group = grouped;

    Ok(grouping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use nbr_core::{AcLineSegment, Equipment, Switch};

    fn mrids(ids: &[&str]) -> HashSet<Mrid> {
        ids.iter().map(|id| Mrid::from(*id)).collect()
    }

    #[test]
    fn test_grouping_partition_is_disjoint() {
        let network = fixtures::negligible_impedance_equipment_basic_network(
            fixtures::NegligibleKind::Junction,
        );
        let grouping = group_negligible_impedance_terminals(
            &"a0-t1".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert!(grouping
            .border_terminals
            .is_disjoint(&grouping.inner_terminals));
        assert_eq!(
            grouping.terminals().count(),
            grouping.border_terminals.len() + grouping.inner_terminals.len()
        );
    }

    #[test]
    fn test_negligible_equipment_and_zero_length_lines_absorbed() {
        for kind in [
            fixtures::NegligibleKind::Junction,
            fixtures::NegligibleKind::Disconnector,
            fixtures::NegligibleKind::BusbarSection,
        ] {
            let network = fixtures::negligible_impedance_equipment_basic_network(kind);
            let grouping = group_negligible_impedance_terminals(
                &"a0-t1".into(),
                &network,
                &default_negligible_impedance,
            )
            .unwrap();
            // a0 and a1 are zero-length lines on either side of nie1.
            assert_eq!(
                grouping.conducting_equipment_group,
                mrids(&["a0", "nie1", "a1"])
            );
            assert_eq!(
                grouping.inner_terminals,
                mrids(&["a0-t1", "a0-t2", "nie1-t1", "nie1-t2", "a1-t1", "a1-t2"])
            );
            assert_eq!(grouping.border_terminals, mrids(&["a2-t1"]));
        }
    }

    #[test]
    fn test_three_terminal_negligible_equipment_groups_all_sides() {
        let network = fixtures::negligible_impedance_equipment_basic_network(
            fixtures::NegligibleKind::Junction,
        );
        let grouping = group_negligible_impedance_terminals(
            &"a3-t1".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["nie2"]));
        assert_eq!(
            grouping.inner_terminals,
            mrids(&["nie2-t1", "nie2-t2", "nie2-t3"])
        );
        assert_eq!(grouping.border_terminals, mrids(&["a2-t2", "a3-t1", "a4-t1"]));
    }

    #[test]
    fn test_no_negligible_equipment_degenerates_to_node_terminals() {
        let network = fixtures::single_branch_common_lines_network(false);
        // The acls1/acls2 node holds no negligible equipment: both of its
        // terminals are border, nothing is absorbed.
        let grouping = group_negligible_impedance_terminals(
            &"acls1-t1".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert!(grouping.conducting_equipment_group.is_empty());
        assert!(grouping.inner_terminals.is_empty());
        assert_eq!(grouping.border_terminals, mrids(&["acls1-t1", "acls2-t1"]));
    }

    #[test]
    fn test_unconnected_terminal_is_its_own_border() {
        let mut network = nbr_core::NodeBreakerNetwork::new();
        network.add_equipment(Equipment::new(
            "lonely",
            nbr_core::EquipmentKind::AcLineSegment(AcLineSegment::new(5.0)),
        ));
        network.create_terminals(&"lonely".into(), 2).unwrap();
        let grouping = group_negligible_impedance_terminals(
            &"lonely-t1".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert!(grouping.conducting_equipment_group.is_empty());
        assert_eq!(grouping.border_terminals, mrids(&["lonely-t1"]));
    }

    #[test]
    fn test_closed_switch_merges_both_sides() {
        let network = fixtures::single_branch_common_lines_network(false);
        let grouping = group_negligible_impedance_terminals(
            &"acls3-t2".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["sw"]));
        assert_eq!(grouping.inner_terminals, mrids(&["sw-t1", "sw-t2"]));
        assert_eq!(grouping.border_terminals, mrids(&["acls3-t2", "acls4-t1"]));
    }

    #[test]
    fn test_open_switch_stops_the_walk() {
        let network = fixtures::single_branch_common_lines_network(true);
        let grouping = group_negligible_impedance_terminals(
            &"acls3-t2".into(),
            &network,
            &default_negligible_impedance,
        )
        .unwrap();
        assert!(grouping.conducting_equipment_group.is_empty());
        assert_eq!(grouping.border_terminals, mrids(&["acls3-t2", "sw-t1"]));
        assert!(!grouping.contains_terminal(&"sw-t2".into()));
    }

    #[test]
    fn test_default_predicate() {
        let open = Equipment::new("sw", nbr_core::EquipmentKind::Switch(Switch::opened()));
        let closed = Equipment::new("sw", nbr_core::EquipmentKind::Switch(Switch::closed()));
        let junction = Equipment::new("j", nbr_core::EquipmentKind::Junction);
        let zero = Equipment::new(
            "z",
            nbr_core::EquipmentKind::AcLineSegment(AcLineSegment::new(0.0)),
        );
        let real = Equipment::new(
            "l",
            nbr_core::EquipmentKind::AcLineSegment(AcLineSegment::new(10.0)),
        );
        assert!(!default_negligible_impedance(&open));
        assert!(default_negligible_impedance(&closed));
        assert!(default_negligible_impedance(&junction));
        assert!(default_negligible_impedance(&zero));
        assert!(!default_negligible_impedance(&real));
    }

    #[test]
    fn test_three_common_lines_group_into_one_chain() {
        let network = fixtures::three_common_lines_network();
        let grouping =
            group_common_ac_line_segment_terminals(&"acls2".into(), &network).unwrap();
        assert_eq!(
            grouping.conducting_equipment_group,
            mrids(&["acls1", "acls2", "acls3"])
        );
        assert_eq!(
            grouping.inner_terminals,
            mrids(&["acls1-t2", "acls2-t1", "acls2-t2", "acls3-t1"])
        );
        assert_eq!(grouping.border_terminals, mrids(&["acls1-t1", "acls3-t2"]));
    }

    #[test]
    fn test_switch_breaks_common_line_chain() {
        let network = fixtures::single_branch_common_lines_network(false);
        let grouping =
            group_common_ac_line_segment_terminals(&"acls1".into(), &network).unwrap();
        assert_eq!(
            grouping.conducting_equipment_group,
            mrids(&["acls1", "acls2", "acls3"])
        );
        assert_eq!(
            grouping.inner_terminals,
            mrids(&["acls1-t1", "acls2-t1", "acls2-t2", "acls3-t1"])
        );
        // acls1-t2 dangles, acls3-t2 sits against the switch.
        assert_eq!(grouping.border_terminals, mrids(&["acls1-t2", "acls3-t2"]));
    }

    #[test]
    fn test_differing_impedance_breaks_chain() {
        let network = fixtures::single_branch_common_lines_network(false);
        // acls4 (plsi2) and acls5 (plsi3) touch but do not share impedance.
        let grouping =
            group_common_ac_line_segment_terminals(&"acls4".into(), &network).unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["acls4"]));
        assert_eq!(grouping.border_terminals, mrids(&["acls4-t1", "acls4-t2"]));
        assert!(grouping.inner_terminals.is_empty());
    }

    #[test]
    fn test_forking_node_breaks_chain() {
        let network = fixtures::multi_branch_common_lines_network();
        let grouping = group_common_ac_line_segment_terminals(&"a1".into(), &network).unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["a0", "a1", "a2"]));
        assert_eq!(
            grouping.inner_terminals,
            mrids(&["a0-t1", "a1-t1", "a1-t2", "a2-t1"])
        );
        // a0-t2 dangles; a2-t2 sits on the 3-terminal fork node.
        assert_eq!(grouping.border_terminals, mrids(&["a0-t2", "a2-t2"]));
    }

    #[test]
    fn test_chain_between_two_forks() {
        let network = fixtures::multi_branch_common_lines_network();
        let grouping = group_common_ac_line_segment_terminals(&"a3".into(), &network).unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["a3"]));
        assert_eq!(grouping.border_terminals, mrids(&["a3-t1", "a3-t2"]));
    }

    #[test]
    fn test_chain_off_a_fork() {
        let network = fixtures::multi_branch_common_lines_network();
        let grouping = group_common_ac_line_segment_terminals(&"a6".into(), &network).unwrap();
        assert_eq!(grouping.conducting_equipment_group, mrids(&["a6", "a7"]));
        assert_eq!(grouping.inner_terminals, mrids(&["a6-t2", "a7-t1"]));
        assert_eq!(grouping.border_terminals, mrids(&["a6-t1", "a7-t2"]));
    }

    #[test]
    fn test_common_grouper_rejects_non_line() {
        let network = fixtures::single_branch_common_lines_network(false);
        assert!(group_common_ac_line_segment_terminals(&"sw".into(), &network).is_err());
    }
}
