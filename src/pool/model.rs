//! Restricted Dantzig-Wolfe master built from the pool.

use super::store::ProposalPool;
use crate::error::DwError;
use crate::model::MasterProblem;
use crate::partition::BlockStructure;

/// The Dantzig-Wolfe reformulation restricted to the pooled proposals.
///
/// Rows: the linking rows of the master (same ranges), then one
/// convexity row `sum lambda = 1` per block that has proposals.
/// Columns: the unassigned master columns copied as-is, then one binary
/// `lambda` column per proposal whose cost is the block's objective
/// contribution. Blocks without proposals are left out entirely.
#[derive(Debug, Clone)]
pub struct DwModel {
    /// The reformulated problem.
    pub problem: MasterProblem,
    /// Master column behind each leading copied column.
    pub master_columns: Vec<usize>,
    /// Pool id behind each `lambda` column (after the copied columns).
    pub proposal_columns: Vec<usize>,
    /// Blocks that own a convexity row, in row order.
    pub blocks: Vec<usize>,
}

impl DwModel {
    /// Builds the restricted master from every proposal in `pool`.
    pub fn build(problem: &MasterProblem, structure: &BlockStructure, pool: &ProposalPool) -> Self {
        let mut dw = MasterProblem::new(problem.sense());
        let mut row_map = vec![None; problem.num_rows()];
        for &r in structure.linking_rows() {
            row_map[r] = Some(dw.add_row(problem.row_lower()[r], problem.row_upper()[r]));
        }

        let mut convexity = vec![None; structure.number_blocks()];
        let mut blocks = Vec::new();
        for block in 0..structure.number_blocks() {
            if pool.for_block(block).next().is_some() {
                convexity[block] = Some(dw.add_row(1.0, 1.0));
                blocks.push(block);
            }
        }

        let mut master_columns = Vec::new();
        for j in (0..problem.num_columns()).filter(|&j| structure.which_column_block()[j].is_none()) {
            let (rows, coefs) = problem.column(j);
            let entries: Vec<(usize, f64)> = rows
                .iter()
                .zip(coefs)
                .filter_map(|(&r, &a)| row_map[r].map(|dr| (dr, a)))
                .collect();
            // Row indices come from `row_map`, so the column is always valid.
            if dw
                .add_column(
                    problem.objective()[j],
                    problem.column_lower()[j],
                    problem.column_upper()[j],
                    problem.is_integer(j),
                    &entries,
                )
                .is_ok()
            {
                master_columns.push(j);
            }
        }

        let mut proposal_columns = Vec::new();
        for (id, proposal) in pool.iter().enumerate() {
            let Some(conv) = convexity[proposal.block] else {
                continue;
            };
            let mut entries: Vec<(usize, f64)> = proposal
                .linking_activity
                .iter()
                .filter_map(|&(r, a)| row_map[r].map(|dr| (dr, a)))
                .collect();
            entries.push((conv, 1.0));
            if dw.add_column(proposal.cost, 0.0, 1.0, true, &entries).is_ok() {
                proposal_columns.push(id);
            }
        }

        Self {
            problem: dw,
            master_columns,
            proposal_columns,
            blocks,
        }
    }

    /// Maps a solution of the reformulation back to master columns.
    ///
    /// Columns of blocks without proposals come back as zero.
    pub fn expand(
        &self,
        dw_solution: &[f64],
        structure: &BlockStructure,
        pool: &ProposalPool,
        num_columns: usize,
    ) -> Result<Vec<f64>, DwError> {
        DwError::check_len(
            "dw solution",
            self.problem.num_columns(),
            dw_solution.len(),
        )?;
        let mut x = vec![0.0; num_columns];
        for (k, &j) in self.master_columns.iter().enumerate() {
            x[j] = dw_solution[k];
        }
        let offset = self.master_columns.len();
        for (k, &id) in self.proposal_columns.iter().enumerate() {
            let lambda = dw_solution[offset + k];
            if lambda == 0.0 {
                continue;
            }
            if let Some(proposal) = pool.get(id) {
                for (&j, &v) in structure.block_columns(proposal.block).iter().zip(&proposal.values) {
                    x[j] += lambda * v;
                }
            }
        }
        Ok(x)
    }
}

impl ProposalPool {
    /// Builds the restricted Dantzig-Wolfe master from this pool.
    pub fn dw_model(&self, problem: &MasterProblem, structure: &BlockStructure) -> DwModel {
        DwModel::build(problem, structure, self)
    }
}
