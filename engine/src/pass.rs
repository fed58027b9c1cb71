// pass.rs — Pass descriptor module: metadata and dependency resolution
//
// Declares the analysis passes the session can run and the passes whose
// results they consume. Used by the session to compute the minimal
// pass subset for a requested terminal pass.

use std::collections::HashSet;

// ── Pass identifiers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    ReadWrite,
    Effects,
    Orthogonality,
    Influence,
    Codomain,
}

// ── Pass descriptor ────────────────────────────────────────────────────────

/// Static metadata about an analysis pass.
pub struct PassDescriptor {
    /// Name used in logs and diagnostics.
    pub name: &'static str,
    /// Passes whose outputs this pass consumes.
    pub inputs: &'static [PassId],
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::ReadWrite => PassDescriptor {
            name: "read_write",
            inputs: &[],
        },
        PassId::Effects => PassDescriptor {
            name: "effects",
            inputs: &[],
        },
        PassId::Orthogonality => PassDescriptor {
            name: "orthogonality",
            inputs: &[],
        },
        // Seeds the closure with the globals the read/write pass saw read.
        PassId::Influence => PassDescriptor {
            name: "influence",
            inputs: &[PassId::ReadWrite],
        },
        PassId::Codomain => PassDescriptor {
            name: "codomain",
            inputs: &[],
        },
    }
}

// ── Dependency resolution ──────────────────────────────────────────────────

/// All pass IDs in declaration order.
pub const ALL_PASSES: [PassId; 5] = [
    PassId::ReadWrite,
    PassId::Effects,
    PassId::Orthogonality,
    PassId::Influence,
    PassId::Codomain,
];

/// Compute the minimal ordered set of passes needed to produce `terminal`.
/// Returns passes in topological (execution) order.
pub fn required_passes(terminal: PassId) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    visit(terminal, &mut visited, &mut order);
    order
}

/// Minimal ordered set of passes producing every pass in `terminals`.
pub fn required_passes_for(terminals: &[PassId]) -> Vec<PassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for &terminal in terminals {
        visit(terminal, &mut visited, &mut order);
    }
    order
}

fn visit(id: PassId, visited: &mut HashSet<PassId>, order: &mut Vec<PassId>) {
    if !visited.insert(id) {
        return;
    }
    for &dep in descriptor(id).inputs {
        visit(dep, visited, order);
    }
    order.push(id);
}

// ── Tests ──────────────────────────────────────────────────────────────────
