use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of auto-assigned package ids. Process-wide so ids stay distinct
/// across every factory created in one run.
static NEXT_PACKAGE_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque token flowing through the network. Identity is the id;
/// two packages with the same id compare equal.
///
/// Packages are deliberately not `Clone`: exactly one buffer, queue or
/// stockpile holds a given package at any instant, and every transfer
/// is a destructive move.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    id: ElementId,
}

impl Package {
    /// Create a package with the next auto-assigned id.
    pub fn new() -> Self {
        Self {
            id: NEXT_PACKAGE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Create a package with an explicit id, bypassing the counter.
    /// Intended for tests and deserialisation.
    pub fn with_id(id: ElementId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}
