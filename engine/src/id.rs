// id.rs — Stable variable identifiers for the action IR
//
// Every declaration (global, local or primed) gets a `VarId` when it is
// added to the declaration arena. IDs are allocated in declaration order,
// so sets and maps keyed by `VarId` iterate deterministically.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Stable identifier for a variable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered set of variables; every analysis returns a fresh one.
pub type VarSet = BTreeSet<VarId>;

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation order, ensuring deterministic assignment.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next_var: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_var(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }

    /// Number of IDs handed out so far.
    pub fn allocated(&self) -> usize {
        self.next_var as usize
    }
}
