//! # nbr-core: Node-Breaker Network Model
//!
//! Core data model for node-breaker electrical networks: mrid-identified
//! equipment, terminals, connectivity nodes, base voltages and per-length
//! sequence impedances, plus the [`NodeBreakerNetwork`] container that owns
//! them all.
//!
//! A node-breaker model describes a network at switchgear resolution: every
//! breaker, disconnector, busbar section and junction is an explicit piece of
//! equipment, and electrical connectivity is expressed through terminals
//! joined at connectivity nodes rather than through direct equipment-to-bus
//! edges.
//!
//! ## Quick Start
//!
//! ```rust
//! use nbr_core::{AcLineSegment, Equipment, EquipmentKind, NodeBreakerNetwork};
//!
//! let mut network = NodeBreakerNetwork::new();
//! network.add_equipment(Equipment::new(
//!     "line",
//!     EquipmentKind::AcLineSegment(AcLineSegment::new(100.0)),
//! ));
//! let terminals = network.create_terminals(&"line".into(), 2).unwrap();
//! assert_eq!(terminals[0].as_str(), "line-t1");
//! println!("{}", network.stats());
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - [`NbrError`] and the [`NbrResult`] alias
//! - [`diagnostics`] - issue collection for aggregate validation reporting

pub mod diagnostics;
pub mod error;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{NbrError, NbrResult};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Identity and units
// ============================================================================

/// Master resource identifier. Every model object is keyed by one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mrid(String);

impl Mrid {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Mrid(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Mrid {
    fn from(id: &str) -> Self {
        Mrid(id.to_string())
    }
}

impl From<String> for Mrid {
    fn from(id: String) -> Self {
        Mrid(id)
    }
}

impl fmt::Display for Mrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nominal voltage in volts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volts(pub u32);

impl Volts {
    #[inline]
    pub fn new(v: u32) -> Self {
        Volts(v)
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Volts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} V", self.0)
    }
}

/// Feeder direction recorded against a terminal. The ordinal gives a stable
/// sort key when an operation needs a deterministic terminal order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeederDirection {
    #[default]
    None,
    Upstream,
    Downstream,
    Both,
}

impl FeederDirection {
    #[inline]
    pub fn ordinal(&self) -> u8 {
        match self {
            FeederDirection::None => 0,
            FeederDirection::Upstream => 1,
            FeederDirection::Downstream => 2,
            FeederDirection::Both => 3,
        }
    }
}

// ============================================================================
// Terminals and connectivity
// ============================================================================

/// A connection point of a piece of equipment. Belongs to exactly one
/// equipment and at most one connectivity node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub mrid: Mrid,
    pub equipment: Mrid,
    pub connectivity_node: Option<Mrid>,
    pub feeder_direction: FeederDirection,
}

impl Terminal {
    pub fn new(mrid: impl Into<Mrid>, equipment: impl Into<Mrid>) -> Self {
        Terminal {
            mrid: mrid.into(),
            equipment: equipment.into(),
            connectivity_node: None,
            feeder_direction: FeederDirection::None,
        }
    }
}

/// Junction point where terminals meet. Terminal order is insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityNode {
    pub mrid: Mrid,
    pub terminals: Vec<Mrid>,
}

impl ConnectivityNode {
    pub fn new(mrid: impl Into<Mrid>) -> Self {
        ConnectivityNode {
            mrid: mrid.into(),
            terminals: Vec::new(),
        }
    }
}

// ============================================================================
// Equipment
// ============================================================================

/// Switching device (breaker, disconnector, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub open: bool,
    pub normally_open: bool,
}

impl Switch {
    pub fn closed() -> Self {
        Switch::default()
    }

    pub fn opened() -> Self {
        Switch {
            open: true,
            normally_open: true,
        }
    }
}

/// Series line segment. `length` is in metres; the impedance reference points
/// into the network's per-length sequence impedance catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcLineSegment {
    pub length: f64,
    pub per_length_sequence_impedance: Option<Mrid>,
}

impl AcLineSegment {
    pub fn new(length: f64) -> Self {
        AcLineSegment {
            length,
            per_length_sequence_impedance: None,
        }
    }

    pub fn with_impedance(mut self, plsi: impl Into<Mrid>) -> Self {
        self.per_length_sequence_impedance = Some(plsi.into());
        self
    }
}

/// Reduced-equivalent series branch. Absent or zero r/x means the branch
/// carries no meaningful impedance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EquivalentBranch {
    pub r: Option<f64>,
    pub x: Option<f64>,
}

impl EquivalentBranch {
    pub fn new(r: f64, x: f64) -> Self {
        EquivalentBranch {
            r: Some(r),
            x: Some(x),
        }
    }

    /// True when either component is missing or zero.
    pub fn has_negligible_impedance(&self) -> bool {
        match (self.r, self.x) {
            (Some(r), Some(x)) => r == 0.0 || x == 0.0,
            _ => true,
        }
    }
}

/// One winding of a power transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerEnd {
    pub mrid: Mrid,
    pub terminal: Option<Mrid>,
    pub rated_u: Volts,
}

impl TransformerEnd {
    pub fn new(mrid: impl Into<Mrid>, rated_u: Volts) -> Self {
        TransformerEnd {
            mrid: mrid.into(),
            terminal: None,
            rated_u,
        }
    }

    pub fn with_terminal(mut self, terminal: impl Into<Mrid>) -> Self {
        self.terminal = Some(terminal.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerTransformer {
    pub ends: Vec<TransformerEnd>,
}

impl PowerTransformer {
    pub fn new(ends: Vec<TransformerEnd>) -> Self {
        PowerTransformer { ends }
    }

    /// The end bound to the given terminal, if any.
    pub fn end_for_terminal(&self, terminal: &Mrid) -> Option<&TransformerEnd> {
        self.ends
            .iter()
            .find(|e| e.terminal.as_ref() == Some(terminal))
    }
}

/// Power injection or offtake values shared by sources, consumers and power
/// electronics connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Injection {
    pub p: f64,
    pub q: f64,
}

impl Injection {
    pub fn new(p: f64, q: f64) -> Self {
        Injection { p, q }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EquipmentKind {
    Switch(Switch),
    Junction,
    BusbarSection,
    AcLineSegment(AcLineSegment),
    EquivalentBranch(EquivalentBranch),
    PowerTransformer(PowerTransformer),
    EnergySource(Injection),
    EnergyConsumer(Injection),
    PowerElectronicsConnection(Injection),
}

/// A piece of conducting equipment. Kind-specific payload lives in
/// [`EquipmentKind`]; terminals are owned by the network and referenced here
/// by mrid in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub mrid: Mrid,
    pub name: String,
    pub base_voltage: Option<Mrid>,
    pub terminals: Vec<Mrid>,
    pub kind: EquipmentKind,
}

impl Equipment {
    pub fn new(mrid: impl Into<Mrid>, kind: EquipmentKind) -> Self {
        let mrid = mrid.into();
        Equipment {
            name: mrid.as_str().to_string(),
            mrid,
            base_voltage: None,
            terminals: Vec::new(),
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_base_voltage(mut self, base_voltage: impl Into<Mrid>) -> Self {
        self.base_voltage = Some(base_voltage.into());
        self
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, EquipmentKind::Switch(_))
    }

    /// True for an open switching device; false for anything else.
    pub fn is_open(&self) -> bool {
        matches!(self.kind, EquipmentKind::Switch(sw) if sw.open)
    }

    pub fn as_line(&self) -> Option<&AcLineSegment> {
        match &self.kind {
            EquipmentKind::AcLineSegment(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_equivalent_branch(&self) -> Option<&EquivalentBranch> {
        match &self.kind {
            EquipmentKind::EquivalentBranch(eb) => Some(eb),
            _ => None,
        }
    }

    pub fn as_transformer(&self) -> Option<&PowerTransformer> {
        match &self.kind {
            EquipmentKind::PowerTransformer(pt) => Some(pt),
            _ => None,
        }
    }

    pub fn as_injection(&self) -> Option<&Injection> {
        match &self.kind {
            EquipmentKind::EnergySource(inj)
            | EquipmentKind::EnergyConsumer(inj)
            | EquipmentKind::PowerElectronicsConnection(inj) => Some(inj),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            EquipmentKind::Switch(_) => "Switch",
            EquipmentKind::Junction => "Junction",
            EquipmentKind::BusbarSection => "BusbarSection",
            EquipmentKind::AcLineSegment(_) => "AcLineSegment",
            EquipmentKind::EquivalentBranch(_) => "EquivalentBranch",
            EquipmentKind::PowerTransformer(_) => "PowerTransformer",
            EquipmentKind::EnergySource(_) => "EnergySource",
            EquipmentKind::EnergyConsumer(_) => "EnergyConsumer",
            EquipmentKind::PowerElectronicsConnection(_) => "PowerElectronicsConnection",
        }
    }
}

// ============================================================================
// Catalog objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseVoltage {
    pub mrid: Mrid,
    pub nominal_voltage: Volts,
}

impl BaseVoltage {
    pub fn new(mrid: impl Into<Mrid>, nominal_voltage: Volts) -> Self {
        BaseVoltage {
            mrid: mrid.into(),
            nominal_voltage,
        }
    }
}

/// Sequence impedance per unit length. The grouper compares catalog identity
/// (mrid), not the numeric values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerLengthSequenceImpedance {
    pub mrid: Mrid,
    pub r: f64,
    pub x: f64,
    pub r0: f64,
    pub x0: f64,
}

impl PerLengthSequenceImpedance {
    pub fn new(mrid: impl Into<Mrid>, r: f64, x: f64) -> Self {
        PerLengthSequenceImpedance {
            mrid: mrid.into(),
            r,
            x,
            r0: 0.0,
            x0: 0.0,
        }
    }

    pub fn with_zero_sequence(mut self, r0: f64, x0: f64) -> Self {
        self.r0 = r0;
        self.x0 = x0;
        self
    }
}

// ============================================================================
// Network container
// ============================================================================

/// Owns all objects of a node-breaker model. Equipment iteration order is
/// insertion order; terminals and connectivity nodes are looked up by mrid.
#[derive(Debug, Clone, Default)]
pub struct NodeBreakerNetwork {
    equipment: Vec<Equipment>,
    equipment_index: HashMap<Mrid, usize>,
    terminals: HashMap<Mrid, Terminal>,
    connectivity_nodes: HashMap<Mrid, ConnectivityNode>,
    base_voltages: HashMap<Mrid, BaseVoltage>,
    impedances: HashMap<Mrid, PerLengthSequenceImpedance>,
    next_node_id: usize,
}

impl NodeBreakerNetwork {
    pub fn new() -> Self {
        NodeBreakerNetwork::default()
    }

    // -- construction --------------------------------------------------------

    pub fn add_equipment(&mut self, equipment: Equipment) {
        self.equipment_index
            .insert(equipment.mrid.clone(), self.equipment.len());
        self.equipment.push(equipment);
    }

    pub fn add_base_voltage(&mut self, base_voltage: BaseVoltage) {
        self.base_voltages
            .insert(base_voltage.mrid.clone(), base_voltage);
    }

    pub fn add_per_length_sequence_impedance(&mut self, plsi: PerLengthSequenceImpedance) {
        self.impedances.insert(plsi.mrid.clone(), plsi);
    }

    /// Appends a terminal to the equipment, minting the mrid `<eq>-t<n>`
    /// with `n` counting from 1.
    pub fn create_terminal(&mut self, equipment: &Mrid) -> NbrResult<Mrid> {
        let index = *self
            .equipment_index
            .get(equipment)
            .ok_or_else(|| NbrError::Model(format!("unknown equipment {equipment}")))?;
        let eq = &mut self.equipment[index];
        let mrid = Mrid::new(format!("{}-t{}", eq.mrid, eq.terminals.len() + 1));
        eq.terminals.push(mrid.clone());
        self.terminals
            .insert(mrid.clone(), Terminal::new(mrid.clone(), equipment.clone()));
        Ok(mrid)
    }

    pub fn create_terminals(&mut self, equipment: &Mrid, count: usize) -> NbrResult<Vec<Mrid>> {
        (0..count).map(|_| self.create_terminal(equipment)).collect()
    }

    pub fn set_feeder_direction(
        &mut self,
        terminal: &Mrid,
        direction: FeederDirection,
    ) -> NbrResult<()> {
        let t = self
            .terminals
            .get_mut(terminal)
            .ok_or_else(|| NbrError::Model(format!("unknown terminal {terminal}")))?;
        t.feeder_direction = direction;
        Ok(())
    }

    /// Joins two terminals under a shared connectivity node. Reuses the node
    /// either terminal is already attached to, otherwise mints `cn-<n>`.
    /// Returns the connectivity node mrid.
    pub fn connect_terminals(&mut self, a: &Mrid, b: &Mrid) -> NbrResult<Mrid> {
        let node_of = |net: &Self, t: &Mrid| -> NbrResult<Option<Mrid>> {
            net.terminals
                .get(t)
                .map(|t| t.connectivity_node.clone())
                .ok_or_else(|| NbrError::Model(format!("unknown terminal {t}")))
        };
        let node = match (node_of(self, a)?, node_of(self, b)?) {
            (Some(cn), _) | (None, Some(cn)) => cn,
            (None, None) => {
                self.next_node_id += 1;
                let cn = Mrid::new(format!("cn-{}", self.next_node_id));
                self.connectivity_nodes
                    .insert(cn.clone(), ConnectivityNode::new(cn.clone()));
                cn
            }
        };
        self.connect_to_node(a, &node)?;
        self.connect_to_node(b, &node)?;
        Ok(node)
    }

    /// Attaches a terminal to an existing connectivity node. A no-op when
    /// already attached to that node.
    pub fn connect_to_node(&mut self, terminal: &Mrid, node: &Mrid) -> NbrResult<()> {
        let t = self
            .terminals
            .get_mut(terminal)
            .ok_or_else(|| NbrError::Model(format!("unknown terminal {terminal}")))?;
        if t.connectivity_node.as_ref() == Some(node) {
            return Ok(());
        }
        if let Some(existing) = &t.connectivity_node {
            return Err(NbrError::Model(format!(
                "terminal {terminal} is already connected to {existing}"
            )));
        }
        let cn = self
            .connectivity_nodes
            .get_mut(node)
            .ok_or_else(|| NbrError::Model(format!("unknown connectivity node {node}")))?;
        t.connectivity_node = Some(node.clone());
        cn.terminals.push(terminal.clone());
        Ok(())
    }

    // -- lookups -------------------------------------------------------------

    pub fn equipment_by_mrid(&self, mrid: &Mrid) -> Option<&Equipment> {
        self.equipment_index.get(mrid).map(|&i| &self.equipment[i])
    }

    pub fn terminal(&self, mrid: &Mrid) -> Option<&Terminal> {
        self.terminals.get(mrid)
    }

    pub fn connectivity_node(&self, mrid: &Mrid) -> Option<&ConnectivityNode> {
        self.connectivity_nodes.get(mrid)
    }

    pub fn base_voltage(&self, mrid: &Mrid) -> Option<&BaseVoltage> {
        self.base_voltages.get(mrid)
    }

    pub fn per_length_sequence_impedance(
        &self,
        mrid: &Mrid,
    ) -> Option<&PerLengthSequenceImpedance> {
        self.impedances.get(mrid)
    }

    /// Equipment owning the given terminal.
    pub fn equipment_of(&self, terminal: &Terminal) -> Option<&Equipment> {
        self.equipment_by_mrid(&terminal.equipment)
    }

    // -- iteration -----------------------------------------------------------

    pub fn equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment.iter()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> {
        self.terminals.values()
    }

    pub fn connectivity_nodes(&self) -> impl Iterator<Item = &ConnectivityNode> {
        self.connectivity_nodes.values()
    }

    pub fn ac_line_segments(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::AcLineSegment(_)))
    }

    pub fn equivalent_branches(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::EquivalentBranch(_)))
    }

    pub fn power_transformers(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::PowerTransformer(_)))
    }

    pub fn energy_sources(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::EnergySource(_)))
    }

    pub fn energy_consumers(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::EnergyConsumer(_)))
    }

    pub fn power_electronics_connections(&self) -> impl Iterator<Item = &Equipment> {
        self.equipment
            .iter()
            .filter(|e| matches!(e.kind, EquipmentKind::PowerElectronicsConnection(_)))
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            equipment_count: self.equipment.len(),
            terminal_count: self.terminals.len(),
            connectivity_node_count: self.connectivity_nodes.len(),
            ac_line_segment_count: self.ac_line_segments().count(),
            power_transformer_count: self.power_transformers().count(),
        }
    }
}

/// Summary counts for a [`NodeBreakerNetwork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub equipment_count: usize,
    pub terminal_count: usize,
    pub connectivity_node_count: usize,
    pub ac_line_segment_count: usize,
    pub power_transformer_count: usize,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} equipment, {} terminals, {} connectivity nodes ({} lines, {} transformers)",
            self.equipment_count,
            self.terminal_count,
            self.connectivity_node_count,
            self.ac_line_segment_count,
            self.power_transformer_count
        )
    }
}
