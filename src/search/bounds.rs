//! Bounds snapshot and scoped bound restriction.

use crate::model::MipSolver;
use std::ops::{Deref, DerefMut};

/// Column bounds of the solver captured once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsSnapshot {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl BoundsSnapshot {
    /// Captures the solver's current working bounds.
    pub fn capture<S: MipSolver + ?Sized>(solver: &S) -> Self {
        Self {
            lower: solver.column_lower().to_vec(),
            upper: solver.column_upper().to_vec(),
        }
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Whether the solver's working bounds equal this snapshot.
    pub fn matches<S: MipSolver + ?Sized>(&self, solver: &S) -> bool {
        self.lower == solver.column_lower() && self.upper == solver.column_upper()
    }
}

/// Tightened bounds on a borrowed solver, undone when dropped.
///
/// Every exit path restores the pre-restriction bounds, including early
/// returns and panics inside the solver. Bounds are only ever tightened:
/// a request is intersected with the current bounds.
///
/// # Examples
///
/// ```
/// use u_dwsearch::model::{MasterProblem, MipSolver, ObjectiveSense, SimpleMipSolver};
/// use u_dwsearch::search::BoundsRestriction;
///
/// let mut p = MasterProblem::new(ObjectiveSense::Minimize);
/// p.add_column(1.0, 0.0, 5.0, true, &[]).unwrap();
/// let mut solver = SimpleMipSolver::new(p);
/// {
///     let mut restricted = BoundsRestriction::new(&mut solver);
///     restricted.tighten(0, 2.0, 2.0);
///     assert_eq!(restricted.column_upper()[0], 2.0);
/// }
/// assert_eq!(solver.column_upper()[0], 5.0);
/// ```
pub struct BoundsRestriction<'a, S: MipSolver + ?Sized> {
    solver: &'a mut S,
    saved: Vec<(usize, f64, f64)>,
}

impl<'a, S: MipSolver + ?Sized> BoundsRestriction<'a, S> {
    pub fn new(solver: &'a mut S) -> Self {
        Self {
            solver,
            saved: Vec::new(),
        }
    }

    /// Intersects column bounds with `[lower, upper]`.
    ///
    /// If the intersection is empty the column is fixed at the nearest
    /// current bound instead.
    pub fn tighten(&mut self, column: usize, lower: f64, upper: f64) {
        let lo = self.solver.column_lower()[column];
        let up = self.solver.column_upper()[column];
        let new_lo = lower.max(lo).min(up);
        let new_up = upper.min(up).max(new_lo);
        if new_lo == lo && new_up == up {
            return;
        }
        self.saved.push((column, lo, up));
        self.solver.set_column_bounds(column, new_lo, new_up);
    }

    /// Number of bound changes currently in force.
    pub fn changes(&self) -> usize {
        self.saved.len()
    }
}

impl<S: MipSolver + ?Sized> Deref for BoundsRestriction<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.solver
    }
}

impl<S: MipSolver + ?Sized> DerefMut for BoundsRestriction<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.solver
    }
}

impl<S: MipSolver + ?Sized> Drop for BoundsRestriction<'_, S> {
    fn drop(&mut self) {
        while let Some((column, lo, up)) = self.saved.pop() {
            self.solver.set_column_bounds(column, lo, up);
        }
    }
}
