//! The decomposition heuristic controller.
//!
//! # Lifecycle
//!
//! 1. The first [`DwHeuristic::run`] detects the block structure. Without
//!    one (or if the host declines it) the heuristic is `Disabled`.
//! 2. Each due call runs a restricted pass on a few selected blocks. A
//!    pass that improves the incumbent feeds every block of the new
//!    solution to the proposal pool.
//! 3. Every `full_dw_every`-th accepted improvement is followed by a full
//!    pass over all blocks in the same call.
//! 4. Failed passes widen the neighborhood, raise the node limit and space
//!    out the calls; spent budgets or a proven bound end the heuristic
//!    (`Exhausted`).

use super::config::DwConfig;
use super::types::{
    CallbackAction, DwCallback, HookPoint, PassRecord, Phase, RunOutcome, SolveState,
};
use crate::error::DwError;
use crate::model::{MipSolver, SolveStatus};
use crate::partition::{BlockStructure, Partitioner};
use crate::pool::{DwModel, ProposalPool};
use crate::search::{BoundsSnapshot, PassMode, SearchDriver, SearchRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassEnd {
    NotImproved,
    Improved,
    /// Improved, but the host asked to skip any follow-up pass.
    ImprovedNoFollowUp,
}

/// Dantzig-Wolfe structure guided neighborhood search over a MIP solver.
///
/// The heuristic owns the solver for its lifetime and only ever changes
/// its column bounds, always restoring them before a call returns.
///
/// # Examples
///
/// ```
/// use u_dwsearch::dw::{DwConfig, DwHeuristic};
/// use u_dwsearch::model::{MasterProblem, ObjectiveSense, SimpleMipSolver};
///
/// let mut p = MasterProblem::new(ObjectiveSense::Minimize);
/// let link = p.add_row(0.0, 4.0);
/// let a = p.add_row(0.0, 1.0);
/// let b = p.add_row(0.0, 1.0);
/// for (row, cost) in [(a, -1.0), (a, -2.0), (b, -1.0), (b, -3.0)] {
///     p.add_column(cost, 0.0, 1.0, true, &[(row, 1.0), (link, 1.0)]).unwrap();
/// }
///
/// let mut dw = DwHeuristic::new(SimpleMipSolver::new(p), DwConfig::default()).unwrap();
/// dw.pass_in_solution(&[0.0; 4]).unwrap();
///
/// let mut objective = 0.0;
/// let mut solution = vec![0.0; 4];
/// let outcome = dw.run(&mut objective, &mut solution);
/// assert!(outcome.is_improved());
/// assert_eq!(dw.number_blocks(), 2);
/// assert!(objective < 0.0);
/// ```
pub struct DwHeuristic<S: MipSolver> {
    solver: S,
    config: DwConfig,
    callback: Option<Box<dyn DwCallback<S>>>,
    rng: StdRng,
    phase: Phase,
    solve_state: SolveState,
    snapshot: BoundsSnapshot,
    row_weights: Vec<f64>,
    structure: Option<BlockStructure>,
    pool: Option<ProposalPool>,
    best_solution: Option<Vec<f64>>,
    best_objective: f64,
    continuous: Option<Vec<f64>>,
    stale: Vec<usize>,
    explored: Vec<usize>,
    calls: usize,
    waiting: usize,
    passes: usize,
    improvements: usize,
    number_dw_times: usize,
    how_often: usize,
    number_needed: usize,
    node_limit: usize,
    history: Vec<PassRecord>,
}

impl<S: MipSolver> DwHeuristic<S> {
    /// Creates the heuristic around `solver`.
    ///
    /// The solver's current column bounds become the bounds snapshot.
    pub fn new(solver: S, config: DwConfig) -> Result<Self, DwError> {
        config.validate()?;
        solver.problem().validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };
        let row_weights = random_row_weights(&mut rng, solver.problem().num_rows());
        let snapshot = BoundsSnapshot::capture(&solver);
        let best_objective = solver.problem().sense().worst();
        Ok(Self {
            how_often: config.how_often,
            number_needed: config.search.number_needed,
            node_limit: config.search.node_limit,
            solver,
            config,
            callback: None,
            rng,
            phase: Phase::Uninitialized,
            solve_state: SolveState::Fine,
            snapshot,
            row_weights,
            structure: None,
            pool: None,
            best_solution: None,
            best_objective,
            continuous: None,
            stale: Vec::new(),
            explored: Vec::new(),
            calls: 0,
            waiting: 0,
            passes: 0,
            improvements: 0,
            number_dw_times: 0,
            history: Vec::new(),
        })
    }

    /// Installs the host callback, replacing any previous one.
    pub fn set_callback<C>(&mut self, callback: C)
    where
        C: DwCallback<S> + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Removes the host callback.
    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// One heuristic invocation from the host search.
    ///
    /// `objective_value` is the host's best objective; a result must
    /// strictly beat both it and this heuristic's incumbent. On
    /// improvement both arguments are overwritten with the new solution.
    /// Failures of any kind are absorbed and reported as
    /// [`RunOutcome::NoImprovement`]. A `new_solution` whose length is not
    /// the column count is rejected before any work is done.
    pub fn run(&mut self, objective_value: &mut f64, new_solution: &mut [f64]) -> RunOutcome {
        if self.phase.is_terminal() {
            return RunOutcome::NoImprovement;
        }
        let columns = self.solver.problem().num_columns();
        if new_solution.len() != columns {
            warn!(
                expected = columns,
                actual = new_solution.len(),
                "solution buffer length differs from column count"
            );
            return RunOutcome::NoImprovement;
        }
        self.calls += 1;
        if self.phase == Phase::Uninitialized && !self.initialize() {
            return RunOutcome::NoImprovement;
        }
        if self.best_solution.is_none() {
            debug!(call = self.calls, "no incumbent to improve");
            return RunOutcome::NoImprovement;
        }
        if self.bound_reached() {
            return RunOutcome::NoImprovement;
        }

        self.waiting += 1;
        if self.waiting < self.how_often {
            trace!(waiting = self.waiting, how_often = self.how_often, "call not due");
            return RunOutcome::NoImprovement;
        }
        self.waiting = 0;

        let sense = self.solver.problem().sense();
        let host_objective = *objective_value;
        let before = self.best_objective;

        let cutoff = sense.best_of(self.best_objective, host_objective);
        let end = self.pass(PassMode::Restricted, cutoff);
        if end == PassEnd::Improved
            && self.config.full_dw_every > 0
            && self.improvements % self.config.full_dw_every == 0
            && self.phase == Phase::Active
        {
            self.pass(PassMode::Full, sense.best_of(self.best_objective, host_objective));
        }

        let improved = sense.is_better(self.best_objective, before, 0.0)
            && sense.is_better(self.best_objective, host_objective, 0.0);
        if self.phase == Phase::Active {
            self.bound_reached();
        }
        if !improved {
            return RunOutcome::NoImprovement;
        }
        let Some(best) = self.best_solution.as_deref().filter(|b| b.len() == columns) else {
            return RunOutcome::NoImprovement;
        };
        new_solution.copy_from_slice(best);
        *objective_value = self.best_objective;
        RunOutcome::Improved
    }

    /// Offers a solution as incumbent.
    ///
    /// Returns `Ok(true)` when it passed the solver's check and improved
    /// the incumbent. Accepted solutions also seed the proposal pool.
    pub fn pass_in_solution(&mut self, solution: &[f64]) -> Result<bool, DwError> {
        let problem = self.solver.problem();
        DwError::check_len("solution", problem.num_columns(), solution.len())?;
        if !self.solver.check_solution(solution) {
            debug!("passed-in solution rejected by the solver");
            return Ok(false);
        }
        let objective = problem.objective_value(solution);
        if self.best_solution.is_some()
            && !problem.sense().is_better(objective, self.best_objective, 0.0)
        {
            return Ok(false);
        }
        if let (Some(structure), Some(pool)) = (self.structure.as_ref(), self.pool.as_mut()) {
            let blocks: Vec<usize> = (0..structure.number_blocks()).collect();
            pool.add_proposals(problem, structure, solution, objective, &blocks, 1.0);
        }
        self.best_solution = Some(solution.to_vec());
        self.best_objective = objective;
        debug!(objective, "incumbent passed in");
        Ok(true)
    }

    /// Supplies the continuous relaxation solution used to pick blocks and
    /// shape neighborhoods.
    pub fn pass_in_continuous_solution(&mut self, solution: &[f64]) -> Result<(), DwError> {
        DwError::check_len(
            "continuous solution",
            self.solver.problem().num_columns(),
            solution.len(),
        )?;
        self.continuous = Some(solution.to_vec());
        Ok(())
    }

    /// Replaces the solver, returning the previous one.
    ///
    /// Structure, pool, incumbent and adaptive state are discarded; the
    /// next `run` starts over.
    pub fn set_model(&mut self, solver: S) -> S {
        let old = std::mem::replace(&mut self.solver, solver);
        self.row_weights = random_row_weights(&mut self.rng, self.solver.problem().num_rows());
        self.best_solution = None;
        self.best_objective = self.solver.problem().sense().worst();
        self.continuous = None;
        self.passes = 0;
        self.improvements = 0;
        self.reset_model();
        old
    }

    /// Notifies that the solver's model or bounds changed in place.
    ///
    /// The bounds snapshot is retaken and structure and pool are dropped.
    /// The incumbent and relaxation survive only if their length still
    /// matches.
    pub fn reset_model(&mut self) {
        let n = self.solver.problem().num_columns();
        self.snapshot = BoundsSnapshot::capture(&self.solver);
        if self.row_weights.len() != self.solver.problem().num_rows() {
            self.row_weights = random_row_weights(&mut self.rng, self.solver.problem().num_rows());
        }
        if self.best_solution.as_ref().is_some_and(|s| s.len() != n) {
            self.best_solution = None;
            self.best_objective = self.solver.problem().sense().worst();
        }
        if self.continuous.as_ref().is_some_and(|c| c.len() != n) {
            self.continuous = None;
        }
        self.structure = None;
        self.pool = None;
        self.stale.clear();
        self.explored.clear();
        self.waiting = 0;
        self.how_often = self.config.how_often;
        self.number_needed = self.config.search.number_needed;
        self.node_limit = self.config.search.node_limit;
        self.phase = Phase::Uninitialized;
        self.solve_state = SolveState::Fine;
        debug!("model reset");
    }

    /// Caps the number of passes; reaching it ends the run with
    /// [`SolveState::MaxPasses`].
    pub fn set_number_passes(&mut self, n: usize) {
        self.config.number_passes = n;
    }

    /// Sets the minimum number of free integers per pass, both the
    /// configured base and the current adapted value.
    pub fn set_number_needed(&mut self, n: usize) {
        self.config.search.number_needed = n;
        self.number_needed = n;
    }

    /// Objective at which the search stops with
    /// [`SolveState::CannotImprove`]; `None` disables the check.
    pub fn set_target_objective(&mut self, target: Option<f64>) {
        self.config.target_objective = target;
    }

    /// Sets the call interval (at least 1), raising `max_how_often` if
    /// needed, and restarts the cadence from it.
    pub fn set_how_often(&mut self, n: usize) {
        self.config.how_often = n.max(1);
        self.config.max_how_often = self.config.max_how_often.max(self.config.how_often);
        self.how_often = self.config.how_often;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn solve_state(&self) -> SolveState {
        self.solve_state
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Mutable solver access; call [`reset_model`](Self::reset_model)
    /// after changing bounds.
    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn config(&self) -> &DwConfig {
        &self.config
    }

    pub fn structure(&self) -> Option<&BlockStructure> {
        self.structure.as_ref()
    }

    /// Number of detected blocks (0 before detection or without structure).
    pub fn number_blocks(&self) -> usize {
        self.structure.as_ref().map_or(0, BlockStructure::number_blocks)
    }

    pub fn which_row_block(&self) -> Option<&[Option<usize>]> {
        self.structure.as_ref().map(BlockStructure::which_row_block)
    }

    pub fn which_column_block(&self) -> Option<&[Option<usize>]> {
        self.structure.as_ref().map(BlockStructure::which_column_block)
    }

    pub fn pool(&self) -> Option<&ProposalPool> {
        self.pool.as_ref()
    }

    pub fn best_solution(&self) -> Option<&[f64]> {
        self.best_solution.as_deref()
    }

    /// Incumbent objective; the sense's worst value without incumbent.
    pub fn best_objective(&self) -> f64 {
        self.best_objective
    }

    /// Master objective when proposal `id` was added.
    pub fn objective_value_when(&self, id: usize) -> Option<f64> {
        self.pool.as_ref()?.objective_value_when(id)
    }

    /// Nonzero column count of proposal `id`.
    pub fn number_columns_dw(&self, id: usize) -> Option<usize> {
        self.pool.as_ref()?.number_columns_dw(id)
    }

    /// Number of passes that added at least one new proposal.
    pub fn number_dw_times(&self) -> usize {
        self.number_dw_times
    }

    pub fn initial_lower(&self) -> &[f64] {
        self.snapshot.lower()
    }

    pub fn initial_upper(&self) -> &[f64] {
        self.snapshot.upper()
    }

    /// Master objective of `solution`.
    pub fn objective_value(&self, solution: &[f64]) -> f64 {
        self.solver.problem().objective_value(solution)
    }

    /// Passes run so far, oldest first.
    pub fn history(&self) -> &[PassRecord] {
        &self.history
    }

    /// Restricted Dantzig-Wolfe master over the current pool.
    pub fn dw_model(&self) -> Option<DwModel> {
        let structure = self.structure.as_ref()?;
        Some(self.pool.as_ref()?.dw_model(self.solver.problem(), structure))
    }

    fn initialize(&mut self) -> bool {
        let Some(structure) = Partitioner::detect(self.solver.problem(), &self.config.partition)
        else {
            info!("no usable block structure, heuristic disabled");
            self.phase = Phase::Disabled;
            return false;
        };
        self.structure = Some(structure);
        if self.notify(HookPoint::BlocksFound) == CallbackAction::Abort {
            return self.decline();
        }
        if let Some(structure) = self.structure.as_mut() {
            structure.sort_blocks(self.solver.problem());
        }
        if self.notify(HookPoint::BlocksSorted) == CallbackAction::Abort {
            return self.decline();
        }

        let Some(structure) = self.structure.as_ref() else {
            return false;
        };
        let problem = self.solver.problem();
        let n = structure.number_blocks();
        self.stale = vec![0; n];
        self.explored.clear();

        let mut pool = ProposalPool::new(problem, &self.row_weights);
        if let Some(best) = self.best_solution.as_deref() {
            let blocks: Vec<usize> = (0..n).collect();
            pool.add_proposals(problem, structure, best, self.best_objective, &blocks, 1.0);
        }
        self.pool = Some(pool);

        if self.continuous.is_none() {
            let columns = self.solver.problem().num_columns();
            self.continuous = self.solver.solve_relaxation().filter(|c| c.len() == columns);
        }
        self.phase = Phase::Active;
        info!(
            blocks = n,
            linking_rows = self.structure.as_ref().map_or(0, |s| s.linking_rows().len()),
            "block structure found"
        );
        true
    }

    fn decline(&mut self) -> bool {
        info!("block structure declined by callback");
        self.structure = None;
        self.phase = Phase::Disabled;
        false
    }

    /// Ends the heuristic when the target or the relaxation bound is met.
    fn bound_reached(&mut self) -> bool {
        if self.best_solution.is_none() {
            return false;
        }
        let problem = self.solver.problem();
        let sense = problem.sense();
        let target_reached = self
            .config
            .target_objective
            .is_some_and(|t| !sense.is_better(t, self.best_objective, 0.0));
        let at_relaxation = self.continuous.as_deref().is_some_and(|c| {
            !sense.is_better(
                problem.objective_value(c),
                self.best_objective,
                self.config.search.improvement_tolerance,
            )
        });
        if target_reached || at_relaxation {
            self.exhaust(SolveState::CannotImprove);
            true
        } else {
            false
        }
    }

    fn exhaust(&mut self, state: SolveState) {
        info!(?state, passes = self.passes, "heuristic exhausted");
        self.solve_state = state;
        self.phase = Phase::Exhausted;
    }

    fn notify(&mut self, point: HookPoint) -> CallbackAction {
        let Some(mut callback) = self.callback.take() else {
            return CallbackAction::Continue;
        };
        let action = callback.call(self, point);
        self.callback = Some(callback);
        if action == CallbackAction::Abort {
            debug!(?point, "callback requested abort");
        }
        action
    }

    fn pass(&mut self, mode: PassMode, cutoff: f64) -> PassEnd {
        if self.passes >= self.config.number_passes {
            self.exhaust(SolveState::MaxPasses);
            return PassEnd::NotImproved;
        }
        let Some(structure) = self.structure.as_ref() else {
            return PassEnd::NotImproved;
        };
        let blocks = match mode {
            PassMode::Restricted => {
                let fractional = SearchDriver::fractional_counts(
                    structure,
                    self.continuous.as_deref(),
                    self.config.search.integer_tolerance,
                );
                SearchDriver::select_blocks(
                    structure,
                    &fractional,
                    &self.stale,
                    &self.explored,
                    self.config.blocks_per_pass,
                )
            }
            PassMode::Full => (0..structure.number_blocks()).collect(),
        };
        if self.notify(HookPoint::BeforeSolve) == CallbackAction::Abort {
            return PassEnd::NotImproved;
        }

        let (Some(structure), Some(incumbent)) =
            (self.structure.as_ref(), self.best_solution.as_deref())
        else {
            return PassEnd::NotImproved;
        };
        let request = SearchRequest {
            structure,
            snapshot: &self.snapshot,
            incumbent,
            continuous: self.continuous.as_deref(),
            blocks: &blocks,
            cutoff,
            number_needed: self.number_needed,
            node_limit: self.node_limit,
        };
        let outcome = SearchDriver::search(&mut self.solver, &request, &self.config.search);
        let all_blocks = structure.number_blocks();
        let total_integers: usize = (0..all_blocks).map(|b| structure.ints_in_block(b)).sum();
        self.passes += 1;
        self.explored = blocks.clone();

        let mut record = PassRecord {
            call: self.calls,
            mode,
            blocks,
            status: outcome.status,
            free_integers: outcome.free_integers,
            improved: false,
            best_objective: self.best_objective,
        };

        let solution = match outcome.solution {
            Some(solution) if outcome.found => solution,
            _ => {
                self.pass_failed(
                    &record.blocks,
                    outcome.status,
                    outcome.all_integers_free,
                    total_integers,
                );
                self.history.push(record);
                return PassEnd::NotImproved;
            }
        };

        let improvement = (self.best_objective - outcome.objective).abs();
        if let (Some(structure), Some(pool)) = (self.structure.as_ref(), self.pool.as_mut()) {
            let every: Vec<usize> = (0..all_blocks).collect();
            let added = pool.add_proposals(
                self.solver.problem(),
                structure,
                &solution,
                outcome.objective,
                &every,
                1.0 + improvement,
            );
            if added > 0 {
                self.number_dw_times += 1;
            }
            trace!(added, pool = pool.len(), "proposals added");
        }
        if self.notify(HookPoint::ProposalsUpdated) == CallbackAction::Abort {
            self.history.push(record);
            return PassEnd::NotImproved;
        }

        self.best_solution = Some(solution);
        self.best_objective = outcome.objective;
        self.improvements += 1;
        self.number_needed = self.config.search.number_needed;
        self.how_often = self.config.how_often;
        for &b in &record.blocks {
            self.stale[b] = 0;
        }
        info!(
            ?mode,
            objective = outcome.objective,
            improvements = self.improvements,
            "improved solution accepted"
        );
        record.improved = true;
        record.best_objective = self.best_objective;
        self.history.push(record);

        if self.notify(HookPoint::ImprovementFound) == CallbackAction::Abort {
            PassEnd::ImprovedNoFollowUp
        } else {
            PassEnd::Improved
        }
    }

    fn pass_failed(
        &mut self,
        blocks: &[usize],
        status: SolveStatus,
        all_integers_free: bool,
        total_integers: usize,
    ) {
        for &b in blocks {
            self.stale[b] += 1;
        }
        match status {
            SolveStatus::NodeLimit => {
                self.node_limit = self.node_limit.saturating_mul(2);
                if self.node_limit > self.config.max_node_limit {
                    self.exhaust(SolveState::MaxNodes);
                    return;
                }
            }
            SolveStatus::Optimal | SolveStatus::Infeasible if all_integers_free => {
                self.exhaust(SolveState::CannotImprove);
                return;
            }
            _ => {}
        }
        self.number_needed = self
            .number_needed
            .saturating_mul(3)
            .div_ceil(2)
            .max(self.number_needed.saturating_add(1))
            .min(total_integers.max(self.number_needed));
        self.how_often = self.how_often.saturating_mul(2).min(self.config.max_how_often);
        debug!(
            number_needed = self.number_needed,
            node_limit = self.node_limit,
            how_often = self.how_often,
            "pass failed, neighborhood widened"
        );
    }
}

fn random_row_weights(rng: &mut StdRng, rows: usize) -> Vec<f64> {
    (0..rows).map(|_| rng.random_range(0.5..1.5)).collect()
}
