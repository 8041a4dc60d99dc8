use num_bigint::BigInt;

/// A growable matrix of integer rows with a fixed column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mat {
    n_col: usize,
    rows: Vec<Vec<BigInt>>,
}

impl Mat {
    pub fn new(n_col: usize) -> Self {
        Mat { n_col, rows: Vec::new() }
    }

    pub fn n_col(&self) -> usize {
        self.n_col
    }

    pub fn n_row(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row and return its index.
    ///
    /// # Panics
    ///
    /// Panics if the row does not have exactly `n_col` entries.
    pub fn push(&mut self, row: Vec<BigInt>) -> usize {
        assert_eq!(row.len(), self.n_col);
        self.rows.push(row);
        self.rows.len() - 1
    }

    pub fn row(&self, i: usize) -> &[BigInt] {
        &self.rows[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut Vec<BigInt> {
        &mut self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[BigInt]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn truncate(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

impl std::fmt::Display for Mat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in &self.rows {
            write!(f, "[")?;
            for (i, v) in row.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn test_push_and_truncate() {
        let mut m = Mat::new(3);
        assert_eq!(m.push(row(&[1, 2, 3])), 0);
        assert_eq!(m.push(row(&[4, 5, 6])), 1);
        assert_eq!(m.n_row(), 2);
        m.truncate(1);
        assert_eq!(m.n_row(), 1);
        assert_eq!(m.row(0), &row(&[1, 2, 3])[..]);
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_wrong_width() {
        let mut m = Mat::new(2);
        m.push(row(&[1, 2, 3]));
    }
}
