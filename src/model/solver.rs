//! External MIP solver interface and a small reference implementation.

use super::problem::MasterProblem;

/// Status reported by a solver after a (restricted) solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolveStatus {
    /// Search completed; the returned solution is optimal within the cutoff.
    Optimal,
    /// A solution was found but optimality was not proven.
    Feasible,
    /// Search completed without any solution better than the cutoff.
    Infeasible,
    /// The node limit stopped the search.
    NodeLimit,
    /// The solver cannot handle the problem as posed.
    Unsupported,
}

/// Limits passed with every solve request.
#[derive(Debug, Clone, Copy)]
pub struct SolveLimits {
    /// Maximum number of search nodes.
    pub node_limit: usize,
    /// Only solutions strictly better than this objective are wanted.
    pub cutoff: f64,
}

/// Result of a solve.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub status: SolveStatus,
    /// Objective of `solution` (meaningless when `solution` is `None`).
    pub objective: f64,
    /// Primal solution, one value per master column.
    pub solution: Option<Vec<f64>>,
    /// Nodes explored.
    pub nodes: usize,
}

impl SolveResult {
    /// Creates a result without a solution.
    pub fn empty(status: SolveStatus) -> Self {
        Self {
            status,
            objective: f64::NAN,
            solution: None,
            nodes: 0,
        }
    }

    /// Whether a primal solution is available.
    pub fn is_solution_found(&self) -> bool {
        self.solution.is_some()
    }
}

/// The stateful LP/MIP solver the heuristic drives.
///
/// The heuristic only ever changes column bounds and always restores
/// them; the row/column structure is read-only. Solves are synchronous
/// and non-reentrant.
pub trait MipSolver {
    /// The master problem (matrix, objective, original bounds).
    fn problem(&self) -> &MasterProblem;

    /// Current working lower bounds.
    fn column_lower(&self) -> &[f64];

    /// Current working upper bounds.
    fn column_upper(&self) -> &[f64];

    /// Replaces the working bounds of one column.
    fn set_column_bounds(&mut self, column: usize, lower: f64, upper: f64);

    /// Solves the problem under the current working bounds.
    fn solve(&mut self, limits: &SolveLimits) -> SolveResult;

    /// Solves the continuous relaxation, if the solver supports it.
    fn solve_relaxation(&mut self) -> Option<Vec<f64>> {
        None
    }

    /// Validates a full solution against the unrestricted problem.
    fn check_solution(&self, solution: &[f64]) -> bool {
        self.problem().is_feasible(solution, 1e-6)
    }
}

/// A depth-first branch-and-bound for small, bounded integer problems.
///
/// Enumerates integer columns in index order with row-activity and
/// objective-bound pruning. Intended for tests and demos, not a real MIP
/// solver.
///
/// # Limitations
///
/// - Every integer column needs finite bounds
/// - Continuous columns must be fixed (`lower == upper`)
/// - No LP relaxation
/// - Domains are enumerated value by value, cheapest first. Values cut off
///   by the objective bound end the column's loop; values rejected by a
///   row still count as nodes, so a wide domain is bounded by the node
///   limit
#[derive(Debug, Clone)]
pub struct SimpleMipSolver {
    problem: MasterProblem,
    lower: Vec<f64>,
    upper: Vec<f64>,
    solves: usize,
}

impl SimpleMipSolver {
    pub fn new(problem: MasterProblem) -> Self {
        let lower = problem.column_lower().to_vec();
        let upper = problem.column_upper().to_vec();
        Self {
            problem,
            lower,
            upper,
            solves: 0,
        }
    }

    /// Number of `solve` calls so far.
    pub fn solve_count(&self) -> usize {
        self.solves
    }
}

impl MipSolver for SimpleMipSolver {
    fn problem(&self) -> &MasterProblem {
        &self.problem
    }

    fn column_lower(&self) -> &[f64] {
        &self.lower
    }

    fn column_upper(&self) -> &[f64] {
        &self.upper
    }

    fn set_column_bounds(&mut self, column: usize, lower: f64, upper: f64) {
        self.lower[column] = lower;
        self.upper[column] = upper;
    }

    fn solve(&mut self, limits: &SolveLimits) -> SolveResult {
        self.solves += 1;
        let mut domains = Vec::with_capacity(self.problem.num_columns());
        for j in 0..self.problem.num_columns() {
            let (lo, up) = (self.lower[j], self.upper[j]);
            if self.problem.is_integer(j) {
                if !lo.is_finite() || !up.is_finite() {
                    return SolveResult::empty(SolveStatus::Unsupported);
                }
                domains.push(((lo - TOLERANCE).ceil(), (up + TOLERANCE).floor()));
            } else if lo == up {
                domains.push((lo, up));
            } else {
                return SolveResult::empty(SolveStatus::Unsupported);
            }
        }
        if domains.iter().any(|&(lo, up)| lo > up) {
            return SolveResult::empty(SolveStatus::Infeasible);
        }

        let mut dfs = DepthFirst::new(&self.problem, domains, limits);
        if dfs.root_feasible() {
            dfs.dive(0);
        }

        let status = if dfs.hit_limit {
            SolveStatus::NodeLimit
        } else if dfs.best.is_some() {
            SolveStatus::Optimal
        } else {
            SolveStatus::Infeasible
        };
        let nodes = dfs.nodes;
        match dfs.best {
            Some(solution) => SolveResult {
                status,
                objective: self.problem.objective_value(&solution),
                solution: Some(solution),
                nodes,
            },
            None => SolveResult {
                nodes,
                ..SolveResult::empty(status)
            },
        }
    }
}

const TOLERANCE: f64 = 1e-6;

struct DepthFirst<'a> {
    problem: &'a MasterProblem,
    domains: Vec<(f64, f64)>,
    /// Objective in minimization form.
    cost: Vec<f64>,
    min_activity: Vec<f64>,
    max_activity: Vec<f64>,
    partial_cost: f64,
    remaining_best: f64,
    best_cost: f64,
    values: Vec<f64>,
    best: Option<Vec<f64>>,
    nodes: usize,
    node_limit: usize,
    hit_limit: bool,
}

impl<'a> DepthFirst<'a> {
    fn new(problem: &'a MasterProblem, domains: Vec<(f64, f64)>, limits: &SolveLimits) -> Self {
        let factor = problem.sense().factor();
        let cost: Vec<f64> = problem.objective().iter().map(|c| c * factor).collect();
        let mut min_activity = vec![0.0; problem.num_rows()];
        let mut max_activity = vec![0.0; problem.num_rows()];
        let mut remaining_best = 0.0;
        for (j, &(lo, up)) in domains.iter().enumerate() {
            let (rows, coefs) = problem.column(j);
            for (&row, &a) in rows.iter().zip(coefs) {
                min_activity[row] += (a * lo).min(a * up);
                max_activity[row] += (a * lo).max(a * up);
            }
            remaining_best += (cost[j] * lo).min(cost[j] * up);
        }
        let best_cost = if limits.cutoff.is_finite() {
            limits.cutoff * factor
        } else {
            f64::INFINITY
        };
        Self {
            problem,
            values: domains.iter().map(|&(lo, _)| lo).collect(),
            domains,
            cost,
            min_activity,
            max_activity,
            partial_cost: 0.0,
            remaining_best,
            best_cost,
            best: None,
            nodes: 0,
            node_limit: limits.node_limit,
            hit_limit: false,
        }
    }

    fn row_ok(&self, row: usize) -> bool {
        self.min_activity[row] <= self.problem.row_upper()[row] + TOLERANCE
            && self.max_activity[row] >= self.problem.row_lower()[row] - TOLERANCE
    }

    fn root_feasible(&self) -> bool {
        (0..self.problem.num_rows()).all(|row| self.row_ok(row))
    }

    fn shift(&mut self, column: usize, value: f64, sign: f64) {
        let (lo, up) = self.domains[column];
        let (rows, coefs) = self.problem.column(column);
        for (&row, &a) in rows.iter().zip(coefs) {
            self.min_activity[row] += sign * (a * value - (a * lo).min(a * up));
            self.max_activity[row] += sign * (a * value - (a * lo).max(a * up));
        }
        self.partial_cost += sign * self.cost[column] * value;
    }

    fn dive(&mut self, depth: usize) {
        if self.nodes >= self.node_limit {
            self.hit_limit = true;
            return;
        }
        self.nodes += 1;

        if depth == self.domains.len() {
            if self.partial_cost < self.best_cost - TOLERANCE {
                self.best_cost = self.partial_cost;
                self.best = Some(self.values.clone());
            }
            return;
        }

        let (lo, up) = self.domains[depth];
        let column_best = (self.cost[depth] * lo).min(self.cost[depth] * up);
        self.remaining_best -= column_best;

        let count = (up - lo) as usize + 1;
        let descending = self.cost[depth] < 0.0;
        for step in 0..count {
            let value = if descending {
                up - step as f64
            } else {
                lo + step as f64
            };
            self.shift(depth, value, 1.0);
            // Cost only grows along the loop, so a bound failure is final.
            let bound_ok = self.partial_cost + self.remaining_best < self.best_cost - TOLERANCE;
            if bound_ok {
                if self.problem.column(depth).0.iter().all(|&r| self.row_ok(r)) {
                    self.values[depth] = value;
                    self.dive(depth + 1);
                } else if self.nodes >= self.node_limit {
                    self.hit_limit = true;
                } else {
                    self.nodes += 1;
                }
            }
            self.shift(depth, value, -1.0);
            if !bound_ok || self.hit_limit {
                break;
            }
        }

        self.values[depth] = lo;
        self.remaining_best += column_best;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectiveSense;

    /// max 3a + 2b + 4c  s.t.  a + b + c <= 2, binaries.
    fn knapsack(sense: ObjectiveSense) -> MasterProblem {
        let mut p = MasterProblem::new(sense);
        let r = p.add_row(f64::NEG_INFINITY, 2.0);
        let sign = if sense == ObjectiveSense::Maximize { 1.0 } else { -1.0 };
        for w in [3.0, 2.0, 4.0] {
            p.add_column(sign * w, 0.0, 1.0, true, &[(r, 1.0)]).unwrap();
        }
        p
    }

    fn unlimited(cutoff: f64) -> SolveLimits {
        SolveLimits {
            node_limit: usize::MAX,
            cutoff,
        }
    }

    #[test]
    fn test_solves_small_knapsack_both_senses() {
        let mut max = SimpleMipSolver::new(knapsack(ObjectiveSense::Maximize));
        let result = max.solve(&unlimited(f64::NEG_INFINITY));
        assert_eq!(result.status, SolveStatus::Optimal);
        assert!((result.objective - 7.0).abs() < 1e-9);
        assert_eq!(result.solution.unwrap(), vec![1.0, 0.0, 1.0]);

        let mut min = SimpleMipSolver::new(knapsack(ObjectiveSense::Minimize));
        let result = min.solve(&unlimited(f64::INFINITY));
        assert!((result.objective + 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_cutoff_excludes_equal_solutions() {
        let mut s = SimpleMipSolver::new(knapsack(ObjectiveSense::Minimize));
        let result = s.solve(&unlimited(-7.0));
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(!result.is_solution_found());
    }

    #[test]
    fn test_respects_working_bounds() {
        let mut s = SimpleMipSolver::new(knapsack(ObjectiveSense::Minimize));
        s.set_column_bounds(2, 0.0, 0.0);
        let result = s.solve(&unlimited(f64::INFINITY));
        assert_eq!(result.solution.unwrap(), vec![1.0, 1.0, 0.0]);
        assert_eq!(s.solve_count(), 1);
    }

    #[test]
    fn test_node_limit_reported() {
        let mut s = SimpleMipSolver::new(knapsack(ObjectiveSense::Minimize));
        let result = s.solve(&SolveLimits {
            node_limit: 2,
            cutoff: f64::INFINITY,
        });
        assert_eq!(result.status, SolveStatus::NodeLimit);
        assert_eq!(result.nodes, 2);
    }

    #[test]
    fn test_wide_domain_stops_at_objective_bound() {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        p.add_column(-1.0, 0.0, 1e12, true, &[]).unwrap();
        let mut s = SimpleMipSolver::new(p);
        let result = s.solve(&unlimited(-2e12));
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert_eq!(result.nodes, 1);
    }

    #[test]
    fn test_wide_domain_row_rejections_hit_node_limit() {
        // 2x = 1 has no integer solution; every value fails the row.
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        let r = p.add_row(1.0, 1.0);
        p.add_column(0.0, 0.0, 1e12, true, &[(r, 2.0)]).unwrap();
        let mut s = SimpleMipSolver::new(p);
        let result = s.solve(&SolveLimits {
            node_limit: 1000,
            cutoff: f64::INFINITY,
        });
        assert_eq!(result.status, SolveStatus::NodeLimit);
        assert_eq!(result.nodes, 1000);
    }

    #[test]
    fn test_free_continuous_unsupported() {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        p.add_column(1.0, 0.0, 1.0, false, &[]).unwrap();
        let mut s = SimpleMipSolver::new(p);
        assert_eq!(
            s.solve(&unlimited(f64::INFINITY)).status,
            SolveStatus::Unsupported
        );
    }
}
