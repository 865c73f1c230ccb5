//! Fixture networks shared by the test suites.
//!
//! Compiled for this crate's own tests and, behind the `test-fixtures`
//! feature, for downstream crates exercising the full reduction.

use nbr_core::{
    AcLineSegment, BaseVoltage, Equipment, EquipmentKind, EquivalentBranch, Injection, Mrid,
    NodeBreakerNetwork, PerLengthSequenceImpedance, PowerTransformer, Switch, TransformerEnd,
    Volts,
};

/// Which negligible-impedance equipment kind a fixture should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegligibleKind {
    Junction,
    Disconnector,
    BusbarSection,
}

impl NegligibleKind {
    fn kind(self) -> EquipmentKind {
        match self {
            NegligibleKind::Junction => EquipmentKind::Junction,
            NegligibleKind::Disconnector => EquipmentKind::Switch(Switch::closed()),
            NegligibleKind::BusbarSection => EquipmentKind::BusbarSection,
        }
    }
}

fn add_line(network: &mut NodeBreakerNetwork, mrid: &str, length: f64, plsi: Option<&str>) {
    let mut line = AcLineSegment::new(length);
    if let Some(plsi) = plsi {
        line = line.with_impedance(plsi);
    }
    network.add_equipment(Equipment::new(mrid, EquipmentKind::AcLineSegment(line)));
    network.create_terminals(&Mrid::from(mrid), 2).unwrap();
}

fn add_with_terminals(
    network: &mut NodeBreakerNetwork,
    equipment: Equipment,
    terminal_count: usize,
) {
    let mrid = equipment.mrid.clone();
    network.add_equipment(equipment);
    network.create_terminals(&mrid, terminal_count).unwrap();
}

fn connect(network: &mut NodeBreakerNetwork, a: &str, b: &str) {
    network
        .connect_terminals(&Mrid::from(a), &Mrid::from(b))
        .unwrap();
}

/// EnergySource -- PowerTransformer (20 kV / 400 V) -- 100 m line -- load
/// and an inverter sharing the load's connectivity node.
///
/// Reduces to 3 topological nodes, 1 topological branch, 1 transformer,
/// 1 source, 1 consumer and 1 power electronics connection.
pub fn simple_node_breaker_network() -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_base_voltage(BaseVoltage::new("20kV", Volts::new(20_000)));
    network.add_base_voltage(BaseVoltage::new("415V", Volts::new(400)));
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));

    add_with_terminals(
        &mut network,
        Equipment::new(
            "grid_connection",
            EquipmentKind::EnergySource(Injection::new(0.0, 0.0)),
        )
        .with_base_voltage("20kV"),
        1,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "transformer",
            EquipmentKind::PowerTransformer(PowerTransformer::new(vec![
                TransformerEnd::new("transformer-e1", Volts::new(20_000))
                    .with_terminal("transformer-t1"),
                TransformerEnd::new("transformer-e2", Volts::new(400))
                    .with_terminal("transformer-t2"),
            ])),
        ),
        2,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "line",
            EquipmentKind::AcLineSegment(AcLineSegment::new(100.0).with_impedance("plsi")),
        )
        .with_base_voltage("415V"),
        2,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "load",
            EquipmentKind::EnergyConsumer(Injection::new(100_000.0, 0.0)),
        )
        .with_base_voltage("415V"),
        1,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "pec",
            EquipmentKind::PowerElectronicsConnection(Injection::new(-5_000.0, 0.0)),
        )
        .with_base_voltage("415V"),
        1,
    );

    connect(&mut network, "grid_connection-t1", "transformer-t1");
    connect(&mut network, "transformer-t2", "line-t1");
    connect(&mut network, "line-t2", "load-t1");
    connect(&mut network, "line-t2", "pec-t1");
    network
}

/// j1 -- acls1 (10 m) -- acls2 (20 m) -- acls3 (30 m) -- j2, all three
/// segments on the same per-length impedance. Reduces to 2 topological
/// nodes and a single 60 m branch.
pub fn three_common_lines_network() -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));
    add_with_terminals(&mut network, Equipment::new("j1", EquipmentKind::Junction), 1);
    add_with_terminals(&mut network, Equipment::new("j2", EquipmentKind::Junction), 1);
    add_line(&mut network, "acls1", 10.0, Some("plsi"));
    add_line(&mut network, "acls2", 20.0, Some("plsi"));
    add_line(&mut network, "acls3", 30.0, Some("plsi"));

    connect(&mut network, "j1-t1", "acls1-t1");
    connect(&mut network, "acls1-t2", "acls2-t1");
    connect(&mut network, "acls2-t2", "acls3-t1");
    connect(&mut network, "acls3-t2", "j2-t1");
    network
}

/// acls1 -- acls2 -- acls3 -- sw -- acls4 -- acls5 where the first three
/// segments share one impedance and the last two each carry their own.
/// acls1-t2 and acls5-t2 are left dangling; `sw_is_open` controls the
/// breaker in the middle.
pub fn single_branch_common_lines_network(sw_is_open: bool) -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    for plsi in ["plsi1", "plsi2", "plsi3"] {
        network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
            plsi, 0.001, 0.002,
        ));
    }
    add_line(&mut network, "acls1", 1.0, Some("plsi1"));
    add_line(&mut network, "acls2", 2.0, Some("plsi1"));
    add_line(&mut network, "acls3", 3.0, Some("plsi1"));
    let sw = if sw_is_open {
        Switch::opened()
    } else {
        Switch::closed()
    };
    add_with_terminals(
        &mut network,
        Equipment::new("sw", EquipmentKind::Switch(sw)),
        2,
    );
    add_line(&mut network, "acls4", 4.0, Some("plsi2"));
    add_line(&mut network, "acls5", 5.0, Some("plsi3"));

    connect(&mut network, "acls1-t1", "acls2-t1");
    connect(&mut network, "acls2-t2", "acls3-t1");
    connect(&mut network, "acls3-t2", "sw-t1");
    connect(&mut network, "sw-t2", "acls4-t1");
    connect(&mut network, "acls4-t2", "acls5-t1");
    network
}

/// Branching tree of segments sharing one impedance:
///
/// ```text
/// a0 - a1 - a2 -+- a3 -+- a4 - a5
///               |      |
///               a6     a8
///               |
///               a7
/// ```
///
/// The 3-terminal nodes after a2 and a3 break the chains. The tree's
/// leaf ends (a0-t2, a5-t2, a7-t2, a8-t2) dangle.
pub fn multi_branch_common_lines_network() -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));
    for mrid in ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7", "a8"] {
        add_line(&mut network, mrid, 1.0, Some("plsi"));
    }

    connect(&mut network, "a0-t1", "a1-t1");
    connect(&mut network, "a1-t2", "a2-t1");
    connect(&mut network, "a2-t2", "a3-t1");
    connect(&mut network, "a2-t2", "a6-t1");
    connect(&mut network, "a3-t2", "a4-t1");
    connect(&mut network, "a3-t2", "a8-t1");
    connect(&mut network, "a4-t2", "a5-t1");
    connect(&mut network, "a6-t2", "a7-t1");
    network
}

/// Two negligible-impedance devices between real lines: nie1 (2 terminals)
/// sandwiched by the zero-length segments a0 and a1, then nie2 (3 terminals)
/// fanning out to a3 and a4.
pub fn negligible_impedance_equipment_basic_network(kind: NegligibleKind) -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));
    add_line(&mut network, "a0", 0.0, None);
    add_with_terminals(&mut network, Equipment::new("nie1", kind.kind()), 2);
    add_line(&mut network, "a1", 0.0, None);
    add_line(&mut network, "a2", 5.0, Some("plsi"));
    add_with_terminals(&mut network, Equipment::new("nie2", kind.kind()), 3);
    add_line(&mut network, "a3", 5.0, Some("plsi"));
    add_line(&mut network, "a4", 5.0, Some("plsi"));

    connect(&mut network, "a0-t1", "nie1-t1");
    connect(&mut network, "nie1-t2", "a1-t1");
    connect(&mut network, "a1-t2", "a2-t1");
    connect(&mut network, "a2-t2", "nie2-t1");
    connect(&mut network, "nie2-t2", "a3-t1");
    connect(&mut network, "nie2-t3", "a4-t1");
    network
}

/// a1 -- a2 feeding a consumer and two power electronics connections that
/// all share the end-of-branch connectivity node. a1-t2 dangles.
pub fn end_of_branch_multiple_ec_pec() -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));
    add_line(&mut network, "a1", 1.0, Some("plsi"));
    add_line(&mut network, "a2", 2.0, Some("plsi"));
    add_with_terminals(
        &mut network,
        Equipment::new("ec", EquipmentKind::EnergyConsumer(Injection::new(1_000.0, 0.0))),
        1,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "pec1",
            EquipmentKind::PowerElectronicsConnection(Injection::new(-500.0, 0.0)),
        ),
        1,
    );
    add_with_terminals(
        &mut network,
        Equipment::new(
            "pec2",
            EquipmentKind::PowerElectronicsConnection(Injection::new(-500.0, 0.0)),
        ),
        1,
    );

    connect(&mut network, "a1-t1", "a2-t1");
    connect(&mut network, "a2-t2", "ec-t1");
    connect(&mut network, "a2-t2", "pec1-t1");
    connect(&mut network, "a2-t2", "pec2-t1");
    network
}

/// Two buses joined by an equivalent branch; `negligible` swaps in a branch
/// whose impedance collapses.
pub fn equivalent_branch_network(negligible: bool) -> NodeBreakerNetwork {
    let mut network = NodeBreakerNetwork::new();
    network.add_per_length_sequence_impedance(PerLengthSequenceImpedance::new(
        "plsi", 0.001, 0.002,
    ));
    add_line(&mut network, "acls1", 10.0, Some("plsi"));
    let eb = if negligible {
        EquivalentBranch::new(0.0, 0.0)
    } else {
        EquivalentBranch::new(0.5, 1.5)
    };
    add_with_terminals(
        &mut network,
        Equipment::new("eb", EquipmentKind::EquivalentBranch(eb)),
        2,
    );
    add_line(&mut network, "acls2", 20.0, Some("plsi"));

    connect(&mut network, "acls1-t2", "eb-t1");
    connect(&mut network, "eb-t2", "acls2-t1");
    network
}
