use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within its kind, and a package. Unique per kind
/// within a single factory; assigned by the caller, not the engine.
pub type ElementId = u64;

/// Turn counter. The first simulated turn is 1.
pub type Time = u64;

/// The three node kinds of a production network.
///
/// Declaration order matters: derived `Ord` drives receiver iteration,
/// report ordering and saved-topology ordering, and matches the
/// lexicographic order of the kind names (`ramp` < `store(house)` < `worker`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Ramp,
    Storehouse,
    Worker,
}

impl NodeKind {
    /// Short tag used by the topology file format.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Ramp => "ramp",
            NodeKind::Storehouse => "store",
            NodeKind::Worker => "worker",
        }
    }

    /// Parse a topology-file tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ramp" => Some(NodeKind::Ramp),
            "store" => Some(NodeKind::Storehouse),
            "worker" => Some(NodeKind::Worker),
            _ => None,
        }
    }

    /// Whether nodes of this kind can receive packages.
    pub fn is_receiver(self) -> bool {
        matches!(self, NodeKind::Storehouse | NodeKind::Worker)
    }

    /// Whether nodes of this kind hold a sending buffer and preferences.
    pub fn is_sender(self) -> bool {
        matches!(self, NodeKind::Ramp | NodeKind::Worker)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Ramp => "ramp",
            NodeKind::Storehouse => "storehouse",
            NodeKind::Worker => "worker",
        };
        f.write_str(name)
    }
}

/// A stable, non-owning reference to a node: `(kind, id)`.
///
/// Receiver preference maps key by this handle. The derived `Ord`
/// (kind first, then id) is the deterministic iteration order required
/// everywhere a receiver list is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle {
    pub kind: NodeKind,
    pub id: ElementId,
}

impl NodeHandle {
    pub fn new(kind: NodeKind, id: ElementId) -> Self {
        Self { kind, id }
    }

    pub fn ramp(id: ElementId) -> Self {
        Self::new(NodeKind::Ramp, id)
    }

    pub fn worker(id: ElementId) -> Self {
        Self::new(NodeKind::Worker, id)
    }

    pub fn storehouse(id: ElementId) -> Self {
        Self::new(NodeKind::Storehouse, id)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}
