// primed.rs — Queries over primed ("next-state") variable chains
//
// A primed variable points at the declaration it primes; following the
// edges ends at the original, unprimed variable (generation 0). Chains are
// acyclic because a primed declaration can only be created over an
// existing base.

use crate::id::{VarId, VarSet};
use crate::model::Declarations;

/// Follow prime edges back to the unprimed original.
pub fn original_variable(decls: &Declarations, var: VarId) -> VarId {
    let mut current = var;
    while let Some(base) = decls.get(current).and_then(|d| d.primed_base()) {
        current = base;
    }
    current
}

/// Number of primes on `var` (0 for an unprimed variable).
pub fn prime_count(decls: &Declarations, var: VarId) -> usize {
    let mut count = 0;
    let mut current = var;
    while let Some(base) = decls.get(current).and_then(|d| d.primed_base()) {
        count += 1;
        current = base;
    }
    count
}

/// True if no declared primed variable primes `var`.
pub fn is_final_primed(decls: &Declarations, var: VarId) -> bool {
    decls.iter().all(|d| d.primed_base() != Some(var))
}

/// Members of `primed` that no other member primes: the heads of each chain
/// restricted to the given set.
pub fn greatest_primed_variables(decls: &Declarations, primed: &VarSet) -> VarSet {
    let mut greatest = primed.clone();
    for var in primed {
        if let Some(base) = decls.get(*var).and_then(|d| d.primed_base()) {
            greatest.remove(&base);
        }
    }
    greatest
}

/// Highest-generation primed variable of every chain in the arena.
pub fn final_primed_variables(decls: &Declarations) -> VarSet {
    let primed: VarSet = decls
        .iter()
        .filter(|d| d.primed_base().is_some())
        .map(|d| d.id)
        .collect();
    greatest_primed_variables(decls, &primed)
}
