//! # nbr-bus: Reference Bus-Branch Network Model
//!
//! A concrete bus-branch model built on an undirected petgraph graph, plus
//! the [`SimpleBusBranchCreator`](creator::SimpleBusBranchCreator) that
//! targets it from the reduction engine.
//!
//! Buses, sources, loads and inverters are graph nodes; branches,
//! transformer windings and injection attachments are graph edges. Typed id
//! newtypes keep the different object spaces apart.
//!
//! ## Quick Start
//!
//! ```rust
//! use nbr_bus::BusBranchNetwork;
//! use nbr_core::Volts;
//!
//! let mut network = BusBranchNetwork::new();
//! let a = network.add_bus("a", Some(Volts::new(400)));
//! let b = network.add_bus("b", Some(Volts::new(400)));
//! network.add_branch("a-b", a, b, 0.1, 0.2, 60.0).unwrap();
//! assert_eq!(network.stats().bus_count, 2);
//! ```

pub mod creator;

pub use creator::{PermissiveValidator, SimpleBusBranchCreator};

use nbr_core::Volts;
use petgraph::graph::{Graph, NodeIndex};
use petgraph::Undirected;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            pub fn new(id: usize) -> Self {
                $name(id)
            }

            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }
    };
}

typed_id!(
    /// Identifier of a bus (collapsed topological node).
    BusId
);
typed_id!(
    /// Identifier of a series branch.
    BranchId
);
typed_id!(
    /// Identifier of a transformer winding edge.
    TransformerId
);
typed_id!(
    /// Identifier of a source attachment.
    SourceId
);
typed_id!(
    /// Identifier of a load attachment.
    LoadId
);
typed_id!(
    /// Identifier of an inverter attachment.
    InverterId
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub base_voltage: Option<Volts>,
}

/// Series branch with total impedance over its merged length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub r: f64,
    pub x: f64,
    /// Metres of conductor this branch stands for.
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub id: TransformerId,
    pub name: String,
    pub rated_u: Vec<Volts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub p: f64,
    pub q: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub p: f64,
    pub q: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inverter {
    pub id: InverterId,
    pub name: String,
    pub p: f64,
    pub q: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusNode {
    Bus(Bus),
    Source(Source),
    Load(Load),
    Inverter(Inverter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BusEdge {
    Branch(Branch),
    Transformer(Transformer),
    /// Attachment of a source, load or inverter to its bus.
    Connection,
}

/// The bus-branch network: an undirected graph of buses and attached
/// injections, joined by branch and transformer edges.
#[derive(Debug, Clone, Default)]
pub struct BusBranchNetwork {
    pub graph: Graph<BusNode, BusEdge, Undirected>,
    bus_index: HashMap<BusId, NodeIndex>,
    next_bus: usize,
    next_branch: usize,
    next_transformer: usize,
    next_source: usize,
    next_load: usize,
    next_inverter: usize,
}

impl BusBranchNetwork {
    pub fn new() -> Self {
        BusBranchNetwork::default()
    }

    pub fn add_bus(&mut self, name: impl Into<String>, base_voltage: Option<Volts>) -> BusId {
        let id = BusId::new(self.next_bus);
        self.next_bus += 1;
        let index = self.graph.add_node(BusNode::Bus(Bus {
            id,
            name: name.into(),
            base_voltage,
        }));
        self.bus_index.insert(id, index);
        id
    }

    /// Adds a series branch between two buses. Returns `None` when either
    /// bus is unknown.
    pub fn add_branch(
        &mut self,
        name: impl Into<String>,
        from: BusId,
        to: BusId,
        r: f64,
        x: f64,
        length: f64,
    ) -> Option<BranchId> {
        let (&from_ix, &to_ix) = (self.bus_index.get(&from)?, self.bus_index.get(&to)?);
        let id = BranchId::new(self.next_branch);
        self.next_branch += 1;
        self.graph.add_edge(
            from_ix,
            to_ix,
            BusEdge::Branch(Branch {
                id,
                name: name.into(),
                r,
                x,
                length,
            }),
        );
        Some(id)
    }

    pub fn add_transformer(
        &mut self,
        name: impl Into<String>,
        from: BusId,
        to: BusId,
        rated_u: Vec<Volts>,
    ) -> Option<TransformerId> {
        let (&from_ix, &to_ix) = (self.bus_index.get(&from)?, self.bus_index.get(&to)?);
        let id = TransformerId::new(self.next_transformer);
        self.next_transformer += 1;
        self.graph.add_edge(
            from_ix,
            to_ix,
            BusEdge::Transformer(Transformer {
                id,
                name: name.into(),
                rated_u,
            }),
        );
        Some(id)
    }

    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        bus: BusId,
        p: f64,
        q: f64,
    ) -> Option<SourceId> {
        let &bus_ix = self.bus_index.get(&bus)?;
        let id = SourceId::new(self.next_source);
        self.next_source += 1;
        let index = self.graph.add_node(BusNode::Source(Source {
            id,
            name: name.into(),
            p,
            q,
        }));
        self.graph.add_edge(index, bus_ix, BusEdge::Connection);
        Some(id)
    }

    pub fn add_load(
        &mut self,
        name: impl Into<String>,
        bus: BusId,
        p: f64,
        q: f64,
    ) -> Option<LoadId> {
        let &bus_ix = self.bus_index.get(&bus)?;
        let id = LoadId::new(self.next_load);
        self.next_load += 1;
        let index = self.graph.add_node(BusNode::Load(Load {
            id,
            name: name.into(),
            p,
            q,
        }));
        self.graph.add_edge(index, bus_ix, BusEdge::Connection);
        Some(id)
    }

    pub fn add_inverter(
        &mut self,
        name: impl Into<String>,
        bus: BusId,
        p: f64,
        q: f64,
    ) -> Option<InverterId> {
        let &bus_ix = self.bus_index.get(&bus)?;
        let id = InverterId::new(self.next_inverter);
        self.next_inverter += 1;
        let index = self.graph.add_node(BusNode::Inverter(Inverter {
            id,
            name: name.into(),
            p,
            q,
        }));
        self.graph.add_edge(index, bus_ix, BusEdge::Connection);
        Some(id)
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        let &index = self.bus_index.get(&id)?;
        match &self.graph[index] {
            BusNode::Bus(bus) => Some(bus),
            _ => None,
        }
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.graph.node_weights().filter_map(|n| match n {
            BusNode::Bus(bus) => Some(bus),
            _ => None,
        })
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.graph.node_weights().filter_map(|n| match n {
            BusNode::Source(source) => Some(source),
            _ => None,
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.graph.node_weights().filter_map(|n| match n {
            BusNode::Load(load) => Some(load),
            _ => None,
        })
    }

    pub fn inverters(&self) -> impl Iterator<Item = &Inverter> {
        self.graph.node_weights().filter_map(|n| match n {
            BusNode::Inverter(inverter) => Some(inverter),
            _ => None,
        })
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.graph.edge_weights().filter_map(|e| match e {
            BusEdge::Branch(branch) => Some(branch),
            _ => None,
        })
    }

    pub fn transformers(&self) -> impl Iterator<Item = &Transformer> {
        self.graph.edge_weights().filter_map(|e| match e {
            BusEdge::Transformer(transformer) => Some(transformer),
            _ => None,
        })
    }

    pub fn stats(&self) -> BusBranchStats {
        BusBranchStats {
            bus_count: self.buses().count(),
            branch_count: self.branches().count(),
            transformer_count: self.transformers().count(),
            source_count: self.sources().count(),
            load_count: self.loads().count(),
            inverter_count: self.inverters().count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusBranchStats {
    pub bus_count: usize,
    pub branch_count: usize,
    pub transformer_count: usize,
    pub source_count: usize,
    pub load_count: usize,
    pub inverter_count: usize,
}

impl fmt::Display for BusBranchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} transformers, {} sources, {} loads, {} inverters",
            self.bus_count,
            self.branch_count,
            self.transformer_count,
            self.source_count,
            self.load_count,
            self.inverter_count
        )
    }
}
