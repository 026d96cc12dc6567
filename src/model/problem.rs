//! Master problem representation.

use crate::error::DwError;

/// Optimization direction of the master problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObjectiveSense {
    #[default]
    Minimize,
    Maximize,
}

impl ObjectiveSense {
    /// Whether `candidate` is strictly better than `reference` by more
    /// than `tolerance`.
    pub fn is_better(self, candidate: f64, reference: f64, tolerance: f64) -> bool {
        match self {
            ObjectiveSense::Minimize => candidate < reference - tolerance,
            ObjectiveSense::Maximize => candidate > reference + tolerance,
        }
    }

    /// The worst possible objective value (starting incumbent).
    pub fn worst(self) -> f64 {
        match self {
            ObjectiveSense::Minimize => f64::INFINITY,
            ObjectiveSense::Maximize => f64::NEG_INFINITY,
        }
    }

    /// The better of two objective values.
    pub fn best_of(self, a: f64, b: f64) -> f64 {
        match self {
            ObjectiveSense::Minimize => a.min(b),
            ObjectiveSense::Maximize => a.max(b),
        }
    }

    /// Signed multiplier that turns this sense into minimization.
    pub fn factor(self) -> f64 {
        match self {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        }
    }
}

/// A mixed-integer master problem.
///
/// The matrix is stored column-major (flat CSC arrays) with a row-major
/// view kept alongside for row scans. Rows are ranged:
/// `row_lower[i] <= a_i x <= row_upper[i]`.
///
/// # Examples
///
/// ```
/// use u_dwsearch::model::{MasterProblem, ObjectiveSense};
///
/// let mut p = MasterProblem::new(ObjectiveSense::Minimize);
/// let r = p.add_row(f64::NEG_INFINITY, 1.0);
/// p.add_column(-1.0, 0.0, 1.0, true, &[(r, 1.0)]).unwrap();
/// p.add_column(-2.0, 0.0, 1.0, true, &[(r, 1.0)]).unwrap();
/// assert_eq!(p.num_columns(), 2);
/// assert_eq!(p.num_nonzeros(), 2);
/// assert!(p.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MasterProblem {
    sense: ObjectiveSense,
    objective: Vec<f64>,
    column_lower: Vec<f64>,
    column_upper: Vec<f64>,
    integer: Vec<bool>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
    column_starts: Vec<usize>,
    row_indices: Vec<usize>,
    values: Vec<f64>,
    rows: Vec<Vec<(usize, f64)>>,
}

impl MasterProblem {
    /// Creates an empty problem.
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            sense,
            objective: Vec::new(),
            column_lower: Vec::new(),
            column_upper: Vec::new(),
            integer: Vec::new(),
            row_lower: Vec::new(),
            row_upper: Vec::new(),
            column_starts: vec![0],
            row_indices: Vec::new(),
            values: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Adds a ranged row and returns its index.
    pub fn add_row(&mut self, lower: f64, upper: f64) -> usize {
        self.row_lower.push(lower);
        self.row_upper.push(upper);
        self.rows.push(Vec::new());
        self.rows.len() - 1
    }

    /// Adds a column with its nonzero entries and returns its index.
    ///
    /// Zero coefficients are dropped. Rows must already exist.
    pub fn add_column(
        &mut self,
        objective: f64,
        lower: f64,
        upper: f64,
        integer: bool,
        entries: &[(usize, f64)],
    ) -> Result<usize, DwError> {
        let column = self.objective.len();
        if let Some(&(row, _)) = entries.iter().find(|&&(row, _)| row >= self.rows.len()) {
            return Err(DwError::InvalidModel(format!(
                "column {column} references row {row}, only {} rows exist",
                self.rows.len()
            )));
        }
        let mut sorted: Vec<(usize, f64)> =
            entries.iter().copied().filter(|&(_, v)| v != 0.0).collect();
        sorted.sort_by_key(|&(row, _)| row);
        if sorted.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(DwError::InvalidModel(format!(
                "column {column} has duplicate row entries"
            )));
        }

        for &(row, value) in &sorted {
            self.row_indices.push(row);
            self.values.push(value);
            self.rows[row].push((column, value));
        }
        self.column_starts.push(self.row_indices.len());
        self.objective.push(objective);
        self.column_lower.push(lower);
        self.column_upper.push(upper);
        self.integer.push(integer);
        Ok(column)
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.objective.len()
    }

    pub fn num_nonzeros(&self) -> usize {
        self.values.len()
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn column_lower(&self) -> &[f64] {
        &self.column_lower
    }

    pub fn column_upper(&self) -> &[f64] {
        &self.column_upper
    }

    pub fn row_lower(&self) -> &[f64] {
        &self.row_lower
    }

    pub fn row_upper(&self) -> &[f64] {
        &self.row_upper
    }

    pub fn is_integer(&self, column: usize) -> bool {
        self.integer[column]
    }

    /// Row indices and coefficients of one column.
    pub fn column(&self, column: usize) -> (&[usize], &[f64]) {
        let range = self.column_starts[column]..self.column_starts[column + 1];
        (&self.row_indices[range.clone()], &self.values[range])
    }

    /// `(column, coefficient)` entries of one row, ordered by column.
    pub fn row(&self, row: usize) -> &[(usize, f64)] {
        &self.rows[row]
    }

    /// Objective value `c^T x`.
    pub fn objective_value(&self, solution: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(solution)
            .map(|(c, x)| c * x)
            .sum()
    }

    /// Row activities `A x`.
    pub fn row_activity(&self, solution: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(j, a)| a * solution[j]).sum())
            .collect()
    }

    /// Checks a full solution against the given column bounds, integrality
    /// and all row ranges.
    pub fn is_feasible_within(
        &self,
        solution: &[f64],
        lower: &[f64],
        upper: &[f64],
        tolerance: f64,
    ) -> bool {
        if solution.len() != self.num_columns() {
            return false;
        }
        let columns_ok = solution.iter().enumerate().all(|(j, &x)| {
            x >= lower[j] - tolerance
                && x <= upper[j] + tolerance
                && (!self.integer[j] || (x - x.round()).abs() <= tolerance)
        });
        columns_ok
            && self
                .row_activity(solution)
                .iter()
                .enumerate()
                .all(|(i, &act)| {
                    act >= self.row_lower[i] - tolerance && act <= self.row_upper[i] + tolerance
                })
    }

    /// Checks a full solution against the problem's own bounds.
    pub fn is_feasible(&self, solution: &[f64], tolerance: f64) -> bool {
        self.is_feasible_within(solution, &self.column_lower, &self.column_upper, tolerance)
    }

    /// Validates bounds of every row and column.
    pub fn validate(&self) -> Result<(), DwError> {
        for j in 0..self.num_columns() {
            let (lo, up) = (self.column_lower[j], self.column_upper[j]);
            if lo.is_nan() || up.is_nan() || lo > up {
                return Err(DwError::InvalidModel(format!(
                    "column {j} has bounds [{lo}, {up}]"
                )));
            }
        }
        for i in 0..self.num_rows() {
            let (lo, up) = (self.row_lower[i], self.row_upper[i]);
            if lo.is_nan() || up.is_nan() || lo > up {
                return Err(DwError::InvalidModel(format!(
                    "row {i} has bounds [{lo}, {up}]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> MasterProblem {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        let r0 = p.add_row(1.0, f64::INFINITY);
        let r1 = p.add_row(f64::NEG_INFINITY, 3.0);
        p.add_column(2.0, 0.0, 1.0, true, &[(r0, 1.0), (r1, 2.0)])
            .unwrap();
        p.add_column(1.0, 0.0, 4.0, false, &[(r1, 1.0), (r0, 0.0)])
            .unwrap();
        p
    }

    #[test]
    fn test_row_and_column_views_agree() {
        let p = small();
        assert_eq!(p.num_nonzeros(), 3);
        assert_eq!(p.column(0).0, &[0, 1]);
        assert_eq!(p.column(1).0, &[1]);
        assert_eq!(p.row(1), &[(0, 2.0), (1, 1.0)]);
    }

    #[test]
    fn test_feasibility_checks_rows_and_integrality() {
        let p = small();
        assert!(p.is_feasible(&[1.0, 1.0], 1e-9));
        assert!(!p.is_feasible(&[0.0, 1.0], 1e-9), "row 0 violated");
        assert!(!p.is_feasible(&[0.5, 0.0], 1e-9), "fractional integer");
        assert!(!p.is_feasible(&[1.0, 2.0], 1e-9), "row 1 violated");
        assert!((p.objective_value(&[1.0, 1.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_bad_row_reference_rejected() {
        let mut p = MasterProblem::new(ObjectiveSense::Minimize);
        assert!(p.add_column(0.0, 0.0, 1.0, true, &[(3, 1.0)]).is_err());
    }

    #[test]
    fn test_validate_bad_bounds() {
        let mut p = MasterProblem::new(ObjectiveSense::Maximize);
        p.add_column(1.0, 2.0, 1.0, true, &[]).unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_sense_comparisons() {
        let min = ObjectiveSense::Minimize;
        let max = ObjectiveSense::Maximize;
        assert!(min.is_better(1.0, 2.0, 1e-9));
        assert!(!min.is_better(2.0, 2.0, 1e-9));
        assert!(max.is_better(3.0, 2.0, 1e-9));
        assert_eq!(max.best_of(1.0, 5.0), 5.0);
        assert_eq!(min.worst(), f64::INFINITY);
    }
}
