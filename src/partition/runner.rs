//! Block-structure detection.
//!
//! # Algorithm
//!
//! 1. Order nonempty rows by decreasing length (ties by index)
//! 2. Candidate k treats the first k rows of that order as linking rows
//!    and unions the columns of every remaining row
//! 3. The smallest k whose components form a usable partition wins:
//!    at least `min_blocks` components and the largest one holding at most
//!    `max_block_fraction` of the assigned columns
//! 4. Rows/columns inside a component form a block; empty rows, linking
//!    rows and columns touched only by linking rows stay unassigned
//!
//! All candidates are scored in one sweep: rows are added to a single
//! disjoint-set forest from the shortest up, so after adding row
//! `order[k]` the forest holds exactly the components of candidate k.
//! Component count and largest size are kept up to date on every union.
//! Only the winning candidate is labelled.

use super::config::PartitionConfig;
use super::types::BlockStructure;
use crate::model::MasterProblem;
use tracing::debug;

/// Disjoint-set forest over column indices (union by rank, path halving)
/// with set sizes.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merges the sets of `x` and `y`; returns the new root if they were
    /// distinct.
    fn union(&mut self, x: usize, y: usize) -> Option<usize> {
        let x_root = self.find(x);
        let y_root = self.find(y);
        if x_root == y_root {
            return None;
        }
        let (root, child) = match self.rank[x_root].cmp(&self.rank[y_root]) {
            std::cmp::Ordering::Less => (y_root, x_root),
            std::cmp::Ordering::Greater => (x_root, y_root),
            std::cmp::Ordering::Equal => {
                self.rank[x_root] += 1;
                (x_root, y_root)
            }
        };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        Some(root)
    }
}

/// Component labelling for one choice of linking rows.
struct Components {
    which_row_block: Vec<Option<usize>>,
    which_column_block: Vec<Option<usize>>,
    number_blocks: usize,
    largest: usize,
    assigned_columns: usize,
}

/// Detects block-angular structure in a master problem.
pub struct Partitioner;

impl Partitioner {
    /// Detects blocks and sorts them by decreasing size.
    ///
    /// Returns `None` when the matrix has no usable block structure, a
    /// normal outcome rather than an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_dwsearch::model::{MasterProblem, ObjectiveSense};
    /// use u_dwsearch::partition::{PartitionConfig, Partitioner};
    ///
    /// let mut p = MasterProblem::new(ObjectiveSense::Minimize);
    /// let link = p.add_row(0.0, 4.0);
    /// let a = p.add_row(0.0, 1.0);
    /// let b = p.add_row(0.0, 1.0);
    /// for row in [a, a, b, b] {
    ///     p.add_column(1.0, 0.0, 1.0, true, &[(row, 1.0), (link, 1.0)]).unwrap();
    /// }
    ///
    /// let s = Partitioner::find_structure(&p, &PartitionConfig::default()).unwrap();
    /// assert_eq!(s.number_blocks(), 2);
    /// assert_eq!(s.linking_rows(), &[link]);
    /// ```
    pub fn find_structure(
        problem: &MasterProblem,
        config: &PartitionConfig,
    ) -> Option<BlockStructure> {
        let mut structure = Self::detect(problem, config)?;
        structure.sort_blocks(problem);
        Some(structure)
    }

    /// Detects blocks without sorting them; block ids follow the lowest
    /// column index of each component.
    pub fn detect(problem: &MasterProblem, config: &PartitionConfig) -> Option<BlockStructure> {
        let order = Self::row_order(problem);
        let max_linking = (config.max_linking_fraction * order.len() as f64).ceil() as usize;

        let n = problem.num_columns();
        let mut sets = DisjointSets::new(n);
        let mut covered = vec![false; n];
        let mut blocks = 0usize;
        let mut largest = 0usize;
        let mut assigned = 0usize;
        let mut chosen = None;
        for (k, &i) in order.iter().enumerate().rev() {
            let row = problem.row(i);
            for &(j, _) in row {
                if !covered[j] {
                    covered[j] = true;
                    blocks += 1;
                    assigned += 1;
                    largest = largest.max(1);
                }
            }
            if let Some((&(first, _), rest)) = row.split_first() {
                for &(j, _) in rest {
                    if let Some(root) = sets.union(first, j) {
                        blocks -= 1;
                        largest = largest.max(sets.size[root]);
                    }
                }
            }
            if k <= max_linking && Self::usable(config, blocks, largest, assigned) {
                chosen = Some(k);
            }
        }

        let Some(k) = chosen else {
            debug!(rows = order.len(), max_linking, "no usable partition");
            return None;
        };
        let mut linking = vec![true; problem.num_rows()];
        for &i in &order[k..] {
            linking[i] = false;
        }
        let components = Self::components(problem, &linking);
        debug!(
            linking_rows = k,
            blocks = components.number_blocks,
            largest = components.largest,
            "partition found"
        );
        Some(BlockStructure::from_assignment(
            problem,
            components.which_row_block,
            components.which_column_block,
            components.number_blocks,
        ))
    }

    /// Nonempty rows by decreasing length, ties by index.
    fn row_order(problem: &MasterProblem) -> Vec<usize> {
        let mut order: Vec<usize> = (0..problem.num_rows())
            .filter(|&i| !problem.row(i).is_empty())
            .collect();
        order.sort_by_key(|&i| (std::cmp::Reverse(problem.row(i).len()), i));
        order
    }

    fn usable(config: &PartitionConfig, blocks: usize, largest: usize, assigned: usize) -> bool {
        blocks >= config.min_blocks
            && largest as f64 <= config.max_block_fraction * assigned as f64
    }

    fn components(problem: &MasterProblem, linking: &[bool]) -> Components {
        let n = problem.num_columns();
        let mut sets = DisjointSets::new(n);
        let mut covered = vec![false; n];
        for i in (0..linking.len()).filter(|&i| !linking[i]) {
            let row = problem.row(i);
            if let Some(&(first, _)) = row.first() {
                for &(j, _) in row {
                    covered[j] = true;
                    sets.union(first, j);
                }
            }
        }

        let mut label = vec![None; n];
        let mut sizes: Vec<usize> = Vec::new();
        let mut which_column_block = vec![None; n];
        for j in (0..n).filter(|&j| covered[j]) {
            let root = sets.find(j);
            let block = *label[root].get_or_insert_with(|| {
                sizes.push(0);
                sizes.len() - 1
            });
            sizes[block] += 1;
            which_column_block[j] = Some(block);
        }

        let which_row_block = (0..problem.num_rows())
            .map(|i| {
                if linking[i] {
                    None
                } else {
                    problem
                        .row(i)
                        .first()
                        .and_then(|&(j, _)| which_column_block[j])
                }
            })
            .collect();

        Components {
            which_row_block,
            which_column_block,
            number_blocks: sizes.len(),
            largest: sizes.iter().copied().max().unwrap_or(0),
            assigned_columns: sizes.iter().sum(),
        }
    }
}
