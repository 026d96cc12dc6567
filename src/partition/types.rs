//! Block structure produced by the partitioner.

use crate::model::MasterProblem;

/// A block-angular decomposition of a master problem.
///
/// Every row and column is either assigned to exactly one block in
/// `[0, number_blocks)` or to the linking category (`None`). Block
/// membership lists are kept as CSR-style offset arrays into flat index
/// arrays, ordered by increasing index inside each block.
///
/// All buffers are rebuilt together whenever the assignment changes, so a
/// structure is never partially stale.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStructure {
    number_blocks: usize,
    which_row_block: Vec<Option<usize>>,
    which_column_block: Vec<Option<usize>>,
    row_starts: Vec<usize>,
    rows_in_block: Vec<usize>,
    column_starts: Vec<usize>,
    columns_in_block: Vec<usize>,
    int_starts: Vec<usize>,
    ints_in_block: Vec<usize>,
    linking_rows: Vec<usize>,
    /// Upper triangle, row-major, pairs `a < b`.
    affinity: Vec<u16>,
}

impl BlockStructure {
    /// Builds all derived buffers from a row/column assignment.
    pub(crate) fn from_assignment(
        problem: &MasterProblem,
        which_row_block: Vec<Option<usize>>,
        which_column_block: Vec<Option<usize>>,
        number_blocks: usize,
    ) -> Self {
        let (row_starts, rows_in_block) = bucket(&which_row_block, number_blocks, |_| true);
        let (column_starts, columns_in_block) =
            bucket(&which_column_block, number_blocks, |_| true);
        let (int_starts, ints_in_block) =
            bucket(&which_column_block, number_blocks, |j| problem.is_integer(j));
        let linking_rows: Vec<usize> = which_row_block
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut structure = Self {
            number_blocks,
            which_row_block,
            which_column_block,
            row_starts,
            rows_in_block,
            column_starts,
            columns_in_block,
            int_starts,
            ints_in_block,
            linking_rows,
            affinity: Vec::new(),
        };
        structure.affinity = structure.compute_affinity(problem);
        structure
    }

    /// Renumbers blocks by decreasing column count (ties: smallest first
    /// column) and rebuilds every buffer.
    pub(crate) fn sort_blocks(&mut self, problem: &MasterProblem) {
        let mut order: Vec<usize> = (0..self.number_blocks).collect();
        order.sort_by_key(|&b| {
            let columns = self.block_columns(b);
            (
                std::cmp::Reverse(columns.len()),
                columns.first().copied().unwrap_or(usize::MAX),
            )
        });
        let mut relabel = vec![0; self.number_blocks];
        for (new, &old) in order.iter().enumerate() {
            relabel[old] = new;
        }
        let rows = self.which_row_block.iter().map(|b| b.map(|b| relabel[b])).collect();
        let columns = self
            .which_column_block
            .iter()
            .map(|b| b.map(|b| relabel[b]))
            .collect();
        *self = Self::from_assignment(problem, rows, columns, self.number_blocks);
    }

    /// Pairwise coupling: number of linking rows with nonzeros in both
    /// blocks, scaled into `u16` when the largest count would overflow.
    fn compute_affinity(&self, problem: &MasterProblem) -> Vec<u16> {
        let n = self.number_blocks;
        let mut counts = vec![0u64; n * n.saturating_sub(1) / 2];
        let mut touched = Vec::new();
        for &row in &self.linking_rows {
            touched.clear();
            touched.extend(
                problem
                    .row(row)
                    .iter()
                    .filter_map(|&(j, _)| self.which_column_block[j]),
            );
            touched.sort_unstable();
            touched.dedup();
            for (k, &a) in touched.iter().enumerate() {
                for &b in &touched[k + 1..] {
                    counts[triangle_index(n, a, b)] += 1;
                }
            }
        }

        let max = counts.iter().copied().max().unwrap_or(0);
        let limit = u64::from(u16::MAX);
        counts
            .into_iter()
            .map(|c| {
                if max <= limit {
                    c as u16
                } else {
                    (c * limit / max) as u16
                }
            })
            .collect()
    }

    /// Number of blocks.
    pub fn number_blocks(&self) -> usize {
        self.number_blocks
    }

    /// Block of every row (`None` = linking).
    pub fn which_row_block(&self) -> &[Option<usize>] {
        &self.which_row_block
    }

    /// Block of every column (`None` = linking / unassigned).
    pub fn which_column_block(&self) -> &[Option<usize>] {
        &self.which_column_block
    }

    /// Rows of one block.
    pub fn block_rows(&self, block: usize) -> &[usize] {
        &self.rows_in_block[self.row_starts[block]..self.row_starts[block + 1]]
    }

    /// Columns of one block.
    pub fn block_columns(&self, block: usize) -> &[usize] {
        &self.columns_in_block[self.column_starts[block]..self.column_starts[block + 1]]
    }

    /// Integer columns of one block; position = fingerprint bit.
    pub fn block_integers(&self, block: usize) -> &[usize] {
        &self.ints_in_block[self.int_starts[block]..self.int_starts[block + 1]]
    }

    /// Number of integer columns in one block.
    pub fn ints_in_block(&self, block: usize) -> usize {
        self.int_starts[block + 1] - self.int_starts[block]
    }

    /// Rows that belong to no block.
    pub fn linking_rows(&self) -> &[usize] {
        &self.linking_rows
    }

    /// Affinity of two distinct blocks; symmetric. Zero for `a == b`.
    pub fn affinity(&self, a: usize, b: usize) -> u16 {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => self.affinity[triangle_index(self.number_blocks, a, b)],
            std::cmp::Ordering::Greater => {
                self.affinity[triangle_index(self.number_blocks, b, a)]
            }
            std::cmp::Ordering::Equal => 0,
        }
    }

    /// Summed affinity of `block` with every block in `others`.
    pub fn affinity_with(&self, block: usize, others: &[usize]) -> u64 {
        others
            .iter()
            .map(|&o| u64::from(self.affinity(block, o)))
            .sum()
    }
}

fn triangle_index(n: usize, a: usize, b: usize) -> usize {
    debug_assert!(a < b && b < n);
    a * n - a * (a + 1) / 2 + (b - a - 1)
}

/// Groups indices by block into CSR arrays, keeping those passing `keep`.
fn bucket(
    which: &[Option<usize>],
    number_blocks: usize,
    keep: impl Fn(usize) -> bool,
) -> (Vec<usize>, Vec<usize>) {
    let mut starts = vec![0; number_blocks + 1];
    for (i, b) in which.iter().enumerate() {
        if let Some(b) = *b {
            if keep(i) {
                starts[b + 1] += 1;
            }
        }
    }
    for b in 0..number_blocks {
        starts[b + 1] += starts[b];
    }
    let mut fill = starts.clone();
    let mut items = vec![0; starts[number_blocks]];
    for (i, b) in which.iter().enumerate() {
        if let Some(b) = *b {
            if keep(i) {
                items[fill[b]] = i;
                fill[b] += 1;
            }
        }
    }
    (starts, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectiveSense;

    /// Three blocks of two columns; row 3 links blocks 0 and 2, row 4
    /// links all three.
    fn three_blocks() -> (MasterProblem, Vec<Option<usize>>, Vec<Option<usize>>) {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        for _ in 0..5 {
            p.add_row(0.0, 10.0);
        }
        for j in 0..6 {
            let block_row = j / 2;
            let mut entries = vec![(block_row, 1.0), (4, 1.0)];
            if block_row != 1 {
                entries.push((3, 1.0));
            }
            p.add_column(1.0, 0.0, 1.0, j % 2 == 0, &entries).unwrap();
        }
        let rows = vec![Some(0), Some(1), Some(2), None, None];
        let columns = (0..6).map(|j| Some(j / 2)).collect();
        (p, rows, columns)
    }

    #[test]
    fn test_csr_membership() {
        let (p, rows, columns) = three_blocks();
        let s = BlockStructure::from_assignment(&p, rows, columns, 3);
        assert_eq!(s.block_columns(1), &[2, 3]);
        assert_eq!(s.block_rows(2), &[2]);
        assert_eq!(s.block_integers(2), &[4]);
        assert_eq!(s.ints_in_block(0), 1);
        assert_eq!(s.linking_rows(), &[3, 4]);
    }

    #[test]
    fn test_affinity_counts_shared_linking_rows() {
        let (p, rows, columns) = three_blocks();
        let s = BlockStructure::from_assignment(&p, rows, columns, 3);
        assert_eq!(s.affinity(0, 2), 2);
        assert_eq!(s.affinity(2, 0), 2);
        assert_eq!(s.affinity(0, 1), 1);
        assert_eq!(s.affinity(1, 2), 1);
        assert_eq!(s.affinity(1, 1), 0);
        assert_eq!(s.affinity_with(0, &[1, 2]), 3);
    }

    #[test]
    fn test_affinity_scaled_into_u16() {
        // One column per block; 70000 linking rows join blocks 0 and 1,
        // 35000 join blocks 0 and 2.
        let (heavy, light) = (70_000, 35_000);
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        for _ in 0..3 + heavy + light {
            p.add_row(0.0, 2.0);
        }
        let shared: Vec<(usize, f64)> = (3..3 + heavy + light).map(|i| (i, 1.0)).collect();
        let mut first = vec![(0, 1.0)];
        first.extend_from_slice(&shared);
        let mut second = vec![(1, 1.0)];
        second.extend_from_slice(&shared[..heavy]);
        let mut third = vec![(2, 1.0)];
        third.extend_from_slice(&shared[heavy..]);
        for entries in [first, second, third] {
            p.add_column(1.0, 0.0, 1.0, true, &entries).unwrap();
        }

        let mut rows = vec![None; p.num_rows()];
        for (b, row) in rows.iter_mut().take(3).enumerate() {
            *row = Some(b);
        }
        let columns = (0..3).map(Some).collect();
        let s = BlockStructure::from_assignment(&p, rows, columns, 3);
        assert_eq!(s.linking_rows().len(), heavy + light);
        assert_eq!(s.affinity(0, 1), u16::MAX);
        // 35000 * 65535 / 70000, truncated.
        assert_eq!(s.affinity(0, 2), 32_767);
        assert_eq!(s.affinity(2, 0), 32_767);
        assert_eq!(s.affinity(1, 2), 0);
        assert_eq!(s.affinity_with(0, &[1, 2]), 65_535 + 32_767);
    }

    #[test]
    fn test_sort_puts_largest_block_first() {
        let (p, mut rows, mut columns) = three_blocks();
        // Fold block 1's columns into block 2 so block 2 is the largest.
        columns[2] = Some(2);
        columns[3] = Some(2);
        rows[1] = Some(2);
        let mut s = BlockStructure::from_assignment(&p, rows, columns, 3);
        assert_eq!(s.block_columns(1), &[] as &[usize]);
        s.sort_blocks(&p);
        assert_eq!(s.block_columns(0), &[2, 3, 4, 5]);
        assert_eq!(s.block_columns(1), &[0, 1]);
        assert_eq!(s.which_column_block()[0], Some(1));
    }

    #[test]
    fn test_triangle_index_is_dense() {
        let n = 5;
        let mut seen = Vec::new();
        for a in 0..n {
            for b in a + 1..n {
                seen.push(triangle_index(n, a, b));
            }
        }
        let expected: Vec<usize> = (0..n * (n - 1) / 2).collect();
        assert_eq!(seen, expected);
    }
}
