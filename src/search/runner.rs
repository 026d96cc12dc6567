//! Neighborhood search over block-restricted problems.
//!
//! # Neighborhood
//!
//! For a set of selected blocks:
//! - integer columns of unselected blocks are fixed to the incumbent
//!   (continuous ones too unless `keep_continuous`)
//! - integer columns of selected blocks stay free where the relaxation is
//!   fractional or disagrees with the incumbent, and are fixed otherwise;
//!   too small a neighborhood is widened up to `number_needed` free
//!   integers
//! - unassigned (linking) columns stay free
//!
//! The restricted problem is handed to the solver inside a
//! [`BoundsRestriction`], so the solver's bounds are back to their
//! previous values before the result is inspected.

use super::bounds::BoundsRestriction;
use super::config::SearchConfig;
use super::types::{SearchOutcome, SearchRequest};
use crate::model::{MipSolver, SolveLimits};
use crate::partition::BlockStructure;
use std::cmp::Reverse;
use tracing::{debug, trace};

/// Runs restricted solves and chooses which blocks to restrict.
pub struct SearchDriver;

impl SearchDriver {
    /// Solves the neighborhood described by `request`.
    ///
    /// A candidate is `found` only if the solver returned a solution that
    /// passes [`MipSolver::check_solution`] and strictly beats the cutoff.
    /// Solver failures are reported through `status`, never as errors.
    pub fn search<S: MipSolver + ?Sized>(
        solver: &mut S,
        request: &SearchRequest<'_>,
        config: &SearchConfig,
    ) -> SearchOutcome {
        let structure = request.structure;
        let tol = config.integer_tolerance;
        let mut selected = vec![false; structure.number_blocks()];
        for &b in request.blocks {
            selected[b] = true;
        }

        // Fixing values never leave the original bounds.
        let snapshot = request.snapshot;
        let clamp = |j: usize, v: f64| v.max(snapshot.lower()[j]).min(snapshot.upper()[j]);
        let mut fixes: Vec<(usize, f64)> = Vec::new();
        let mut widen: Vec<(usize, f64)> = Vec::new();
        let mut free_integers = 0usize;
        let mut fixed_integers = 0usize;

        for (block, &is_selected) in selected.iter().enumerate() {
            if is_selected {
                for &j in structure.block_integers(block) {
                    let inc = request.incumbent[j];
                    match request.continuous {
                        Some(c) if (c[j] - c[j].round()).abs() <= tol
                            && (c[j].round() - inc).abs() <= tol =>
                        {
                            widen.push((j, (c[j] - inc).abs()));
                        }
                        _ => free_integers += 1,
                    }
                }
            } else {
                for &j in structure.block_columns(block) {
                    if solver.problem().is_integer(j) {
                        fixes.push((j, clamp(j, request.incumbent[j].round())));
                        fixed_integers += 1;
                    } else if !config.keep_continuous {
                        fixes.push((j, clamp(j, request.incumbent[j])));
                    }
                }
            }
        }

        // Widen with the columns closest to disagreeing; the rest are fixed.
        widen.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let extra = request.number_needed.saturating_sub(free_integers).min(widen.len());
        free_integers += extra;
        for &(j, _) in &widen[extra..] {
            fixes.push((j, clamp(j, request.incumbent[j].round())));
            fixed_integers += 1;
        }

        let limits = SolveLimits {
            node_limit: request.node_limit,
            cutoff: request.cutoff,
        };
        let result = {
            let mut restricted = BoundsRestriction::new(solver);
            for &(j, v) in &fixes {
                restricted.tighten(j, v, v);
            }
            trace!(changes = restricted.changes(), "bounds restricted");
            restricted.solve(&limits)
        };

        let sense = solver.problem().sense();
        let mut outcome = SearchOutcome {
            found: false,
            objective: f64::NAN,
            solution: None,
            status: result.status,
            free_integers,
            all_integers_free: fixed_integers == 0,
            nodes: result.nodes,
        };
        if let Some(solution) = result.solution {
            let objective = solver.problem().objective_value(&solution);
            let valid = solution.len() == solver.problem().num_columns()
                && solver.check_solution(&solution);
            if valid && sense.is_better(objective, request.cutoff, config.improvement_tolerance) {
                outcome.found = true;
                outcome.objective = objective;
                outcome.solution = Some(solution);
            } else {
                debug!(valid, objective, "restricted solution rejected");
            }
        }
        debug!(
            blocks = ?request.blocks,
            free_integers,
            status = ?outcome.status,
            found = outcome.found,
            "restricted solve"
        );
        outcome
    }

    /// Number of fractional integer columns of each block.
    pub fn fractional_counts(
        structure: &BlockStructure,
        continuous: Option<&[f64]>,
        tolerance: f64,
    ) -> Vec<usize> {
        (0..structure.number_blocks())
            .map(|b| match continuous {
                Some(c) => structure
                    .block_integers(b)
                    .iter()
                    .filter(|&&j| (c[j] - c[j].round()).abs() > tolerance)
                    .count(),
                None => 0,
            })
            .collect()
    }

    /// Picks `count` blocks for a restricted pass.
    ///
    /// The first block minimizes, in order: recent failures (`stale`),
    /// negated fractional count, affinity with `explored`, index.
    /// Further blocks prefer high affinity with the blocks already chosen,
    /// so strongly coupled blocks move together.
    pub fn select_blocks(
        structure: &BlockStructure,
        fractional: &[usize],
        stale: &[usize],
        explored: &[usize],
        count: usize,
    ) -> Vec<usize> {
        let n = structure.number_blocks();
        let count = count.min(n);
        if count == 0 {
            return Vec::new();
        }
        let Some(first) = (0..n).min_by_key(|&b| {
            (
                stale[b],
                Reverse(fractional[b]),
                structure.affinity_with(b, explored),
                b,
            )
        }) else {
            return Vec::new();
        };

        let mut chosen = vec![first];
        while chosen.len() < count {
            let next = (0..n).filter(|b| !chosen.contains(b)).min_by_key(|&b| {
                (
                    stale[b],
                    Reverse(structure.affinity_with(b, &chosen)),
                    Reverse(fractional[b]),
                    b,
                )
            });
            match next {
                Some(b) => chosen.push(b),
                None => break,
            }
        }
        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MasterProblem, ObjectiveSense, SimpleMipSolver, SolveResult, SolveStatus};
    use crate::partition::{PartitionConfig, Partitioner};
    use crate::search::BoundsSnapshot;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    /// Two groups of `size` binaries, value `-(j % size + 1)`, at most
    /// three ones per group, one linking row.
    fn problem(size: usize) -> MasterProblem {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        let link = p.add_row(f64::NEG_INFINITY, (2 * size) as f64);
        let a = p.add_row(f64::NEG_INFINITY, 3.0);
        let b = p.add_row(f64::NEG_INFINITY, 3.0);
        for j in 0..2 * size {
            let local = if j < size { a } else { b };
            let value = -((j % size) as f64 + 1.0);
            p.add_column(value, 0.0, 1.0, true, &[(local, 1.0), (link, 1.0)])
                .unwrap();
        }
        p
    }

    fn request<'a>(
        structure: &'a BlockStructure,
        snapshot: &'a BoundsSnapshot,
        incumbent: &'a [f64],
        continuous: Option<&'a [f64]>,
        blocks: &'a [usize],
    ) -> SearchRequest<'a> {
        SearchRequest {
            structure,
            snapshot,
            incumbent,
            continuous,
            blocks,
            cutoff: 0.0,
            number_needed: 0,
            node_limit: 100_000,
        }
    }

    #[test]
    fn test_restricted_block_improves_and_bounds_restored() {
        let p = problem(5);
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        let mut solver = SimpleMipSolver::new(p);
        let snapshot = BoundsSnapshot::capture(&solver);
        let incumbent = vec![0.0; 10];
        let req = request(&s, &snapshot, &incumbent, None, &[0]);

        let outcome = SearchDriver::search(&mut solver, &req, &SearchConfig::default());
        assert!(outcome.found);
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.objective + 12.0).abs() < 1e-9);
        assert_eq!(outcome.free_integers, 5);
        assert!(!outcome.all_integers_free);
        // The unselected block stays at the incumbent.
        let x = outcome.solution.unwrap();
        assert!(s.block_columns(1).iter().all(|&j| x[j] == 0.0));
        assert!(snapshot.matches(&solver));
    }

    #[test]
    fn test_agreeing_columns_fixed_and_widened() {
        let p = problem(5);
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        let mut solver = SimpleMipSolver::new(p);
        let snapshot = BoundsSnapshot::capture(&solver);
        let incumbent = vec![0.0; 10];
        // Block 0: columns 0,1 fractional, 2..5 integral and equal to incumbent.
        let mut continuous = vec![0.0; 10];
        continuous[0] = 0.5;
        continuous[1] = 0.5;
        let req = request(&s, &snapshot, &incumbent, Some(&continuous), &[0]);

        let outcome = SearchDriver::search(&mut solver, &req, &SearchConfig::default());
        assert_eq!(outcome.free_integers, 2);
        assert!((outcome.objective + 3.0).abs() < 1e-9);

        let wide = SearchRequest {
            number_needed: 4,
            ..req
        };
        let outcome = SearchDriver::search(&mut solver, &wide, &SearchConfig::default());
        assert_eq!(outcome.free_integers, 4);
        assert!((outcome.objective + 9.0).abs() < 1e-9);
        assert!(snapshot.matches(&solver));
    }

    #[test]
    fn test_no_improvement_is_not_found() {
        let p = problem(3);
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        let mut solver = SimpleMipSolver::new(p);
        let snapshot = BoundsSnapshot::capture(&solver);
        let incumbent = vec![1.0; 6];
        let blocks = [0, 1];
        let req = SearchRequest {
            cutoff: -12.0,
            ..request(&s, &snapshot, &incumbent, None, &blocks)
        };
        let outcome = SearchDriver::search(&mut solver, &req, &SearchConfig::default());
        assert!(!outcome.found);
        assert!(outcome.all_integers_free);
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(snapshot.matches(&solver));
    }

    /// Reports fixed bounds as the solution and can be told to fail.
    struct FlakySolver {
        inner: SimpleMipSolver,
        panic: bool,
        seen_fixed: usize,
    }

    impl MipSolver for FlakySolver {
        fn problem(&self) -> &MasterProblem {
            self.inner.problem()
        }
        fn column_lower(&self) -> &[f64] {
            self.inner.column_lower()
        }
        fn column_upper(&self) -> &[f64] {
            self.inner.column_upper()
        }
        fn set_column_bounds(&mut self, column: usize, lower: f64, upper: f64) {
            self.inner.set_column_bounds(column, lower, upper);
        }
        fn solve(&mut self, _limits: &SolveLimits) -> SolveResult {
            self.seen_fixed = (0..self.problem().num_columns())
                .filter(|&j| self.column_lower()[j] == self.column_upper()[j])
                .count();
            if self.panic {
                panic!("solver crashed");
            }
            SolveResult::empty(SolveStatus::Unsupported)
        }
    }

    #[test]
    fn test_bounds_restored_on_failure_and_panic() {
        let p = problem(4);
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        let mut solver = FlakySolver {
            inner: SimpleMipSolver::new(p),
            panic: false,
            seen_fixed: 0,
        };
        let snapshot = BoundsSnapshot::capture(&solver);
        let incumbent = vec![0.0; 8];
        let req = request(&s, &snapshot, &incumbent, None, &[1]);

        let outcome = SearchDriver::search(&mut solver, &req, &SearchConfig::default());
        assert!(!outcome.found);
        assert_eq!(outcome.status, SolveStatus::Unsupported);
        assert_eq!(solver.seen_fixed, 4);
        assert!(snapshot.matches(&solver));

        solver.panic = true;
        let crashed = catch_unwind(AssertUnwindSafe(|| {
            SearchDriver::search(&mut solver, &req, &SearchConfig::default())
        }));
        assert!(crashed.is_err());
        assert!(snapshot.matches(&solver));
    }

    #[test]
    fn test_select_prefers_fractional_then_fresh_blocks() {
        let p = problem(4);
        let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
        let mut continuous = vec![0.0; 8];
        continuous[5] = 0.5;
        continuous[6] = 0.25;
        continuous[1] = 0.5;
        let fractional = SearchDriver::fractional_counts(&s, Some(&continuous), 1e-6);
        assert_eq!(fractional, vec![1, 2]);

        assert_eq!(SearchDriver::select_blocks(&s, &fractional, &[0, 0], &[], 1), vec![1]);
        assert_eq!(SearchDriver::select_blocks(&s, &fractional, &[0, 1], &[1], 1), vec![0]);
        assert_eq!(SearchDriver::select_blocks(&s, &fractional, &[0, 0], &[], 5), vec![1, 0]);
        assert_eq!(SearchDriver::fractional_counts(&s, None, 1e-6), vec![0, 0]);
    }
}
