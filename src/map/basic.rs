use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::map::space::Space;
use crate::tab::tableau::Tab;
use crate::utils::seq;

// A basic map: a conjunction of integer affine equalities and inequalities
// over the space dimensions plus existentially quantified divs. Constraint
// rows are [constant, space coeffs.., div coeffs..]; a div row is
// [denominator, constant, coeffs..] with denominator 0 for an unknown div.
// A div may only reference earlier divs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicMap {
    space: Space,
    eqs: Vec<Vec<BigInt>>,
    ineqs: Vec<Vec<BigInt>>,
    divs: Vec<Vec<BigInt>>,
    rational: bool,
    finalized: bool,
    no_implicit: bool,
    no_redundant: bool,
    empty: bool,
}

impl BasicMap {
    pub fn new(space: Space, n_div: usize) -> Self {
        let total = space.dim() + n_div;
        BasicMap {
            space,
            eqs: Vec::new(),
            ineqs: Vec::new(),
            divs: vec![vec![BigInt::zero(); 2 + total]; n_div],
            rational: false,
            finalized: false,
            no_implicit: false,
            no_redundant: false,
            empty: false,
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn total_dim(&self) -> usize {
        self.space.dim() + self.divs.len()
    }

    pub fn n_eq(&self) -> usize {
        self.eqs.len()
    }

    pub fn n_ineq(&self) -> usize {
        self.ineqs.len()
    }

    pub fn n_div(&self) -> usize {
        self.divs.len()
    }

    pub fn eq(&self, k: usize) -> &[BigInt] {
        &self.eqs[k]
    }

    pub fn ineq(&self, k: usize) -> &[BigInt] {
        &self.ineqs[k]
    }

    pub fn div(&self, k: usize) -> &[BigInt] {
        &self.divs[k]
    }

    pub fn eqs(&self) -> impl Iterator<Item = &[BigInt]> {
        self.eqs.iter().map(|r| r.as_slice())
    }

    pub fn ineqs(&self) -> impl Iterator<Item = &[BigInt]> {
        self.ineqs.iter().map(|r| r.as_slice())
    }

    pub fn divs(&self) -> impl Iterator<Item = &[BigInt]> {
        self.divs.iter().map(|r| r.as_slice())
    }

    pub fn add_eq(&mut self, row: Vec<BigInt>) {
        assert_eq!(row.len(), 1 + self.total_dim());
        self.eqs.push(row);
    }

    pub fn add_ineq(&mut self, row: Vec<BigInt>) {
        assert_eq!(row.len(), 1 + self.total_dim());
        self.ineqs.push(row);
    }

    pub fn set_div(&mut self, k: usize, row: Vec<BigInt>) {
        assert_eq!(row.len(), 2 + self.total_dim());
        self.divs[k] = row;
    }

    pub fn relax_ineq(&mut self, k: usize) {
        self.ineqs[k][0] += 1;
    }

    pub fn is_rational(&self) -> bool {
        self.rational
    }

    pub fn set_rational(&mut self) {
        self.rational = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn mark_final(&mut self) {
        self.finalized = true;
    }

    pub fn no_implicit(&self) -> bool {
        self.no_implicit
    }

    pub fn no_redundant(&self) -> bool {
        self.no_redundant
    }

    pub fn set_no_implicit(&mut self) {
        self.no_implicit = true;
    }

    pub fn set_no_redundant(&mut self) {
        self.no_redundant = true;
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn set_empty(&mut self) {
        self.empty = true;
    }

    pub fn divs_known(&self) -> bool {
        self.divs.iter().all(|d| !d[0].is_zero())
    }

    // Gaussian elimination on the equalities, pivoting from the last column
    // so divs and outputs are eliminated first. A contradictory equality
    // marks the basic map empty.
    pub fn gauss(&mut self) {
        if self.empty {
            return;
        }
        let total = self.total_dim();
        let mut done = 0;
        for col in (1..=total).rev() {
            let Some(k) = (done..self.eqs.len()).find(|&k| !self.eqs[k][col].is_zero()) else {
                continue;
            };
            self.eqs.swap(done, k);
            if self.eqs[done][col].is_negative() {
                let neg = seq::neg(&self.eqs[done]);
                self.eqs[done] = neg;
            }
            let pivot = self.eqs[done].clone();
            let p = pivot[col].clone();
            for k in 0..self.eqs.len() {
                if k == done || self.eqs[k][col].is_zero() {
                    continue;
                }
                let f = -&self.eqs[k][col];
                let mut reduced = seq::combine(&p, &self.eqs[k], &f, &pivot);
                seq::normalize(&mut reduced);
                self.eqs[k] = reduced;
            }
            for row in self.ineqs.iter_mut() {
                if row[col].is_zero() {
                    continue;
                }
                let f = -&row[col];
                *row = seq::combine(&p, row, &f, &pivot);
                if self.rational {
                    seq::normalize(row);
                } else {
                    seq::normalize_ineq(row);
                }
            }
            for div in self.divs.iter_mut() {
                if div[0].is_zero() || div[1 + col].is_zero() {
                    continue;
                }
                let f = -&div[1 + col];
                let num = seq::combine(&p, &div[1..], &f, &pivot);
                let mut new_div = Vec::with_capacity(div.len());
                new_div.push(&div[0] * &p);
                new_div.extend(num);
                seq::normalize(&mut new_div);
                *div = new_div;
            }
            done += 1;
        }
        for k in done..self.eqs.len() {
            if !self.eqs[k][0].is_zero() {
                self.empty = true;
                return;
            }
        }
        self.eqs.truncate(done);
    }

    // Opposite inequalities whose constants sum to zero pin an equality; a
    // negative sum proves emptiness.
    pub fn detect_inequality_pairs(&mut self) {
        let n = self.ineqs.len();
        let mut dropped = vec![false; n];
        for k in 0..n {
            if dropped[k] {
                continue;
            }
            for l in k + 1..n {
                if dropped[l] || !seq::is_neg(&self.ineqs[k][1..], &self.ineqs[l][1..]) {
                    continue;
                }
                let sum = &self.ineqs[k][0] + &self.ineqs[l][0];
                if sum.is_negative() {
                    self.empty = true;
                    return;
                }
                if sum.is_zero() {
                    self.eqs.push(self.ineqs[k].clone());
                    dropped[k] = true;
                    dropped[l] = true;
                    break;
                }
            }
        }
        let mut k = 0;
        self.ineqs.retain(|_| {
            let keep = !dropped[k];
            k += 1;
            keep
        });
    }

    pub fn finalize(&mut self) {
        if !self.empty {
            for row in self.eqs.iter_mut() {
                seq::normalize(row);
                if seq::is_zero(&row[1..]) && !row[0].is_zero() {
                    self.empty = true;
                    break;
                }
            }
        }
        if !self.empty {
            for row in self.ineqs.iter_mut() {
                if self.rational {
                    seq::normalize(row);
                } else {
                    seq::normalize_ineq(row);
                }
            }
        }
        self.finalized = true;
    }

    // Integer membership; div values are computed from their defining
    // expressions, so all divs must be known.
    pub fn contains_point(&self, point: &[BigInt]) -> bool {
        use num_integer::Integer;

        assert_eq!(point.len(), self.space.dim());
        assert!(self.divs_known());
        if self.empty {
            return false;
        }
        let mut full = point.to_vec();
        for div in &self.divs {
            debug_assert!(div[2 + full.len()..].iter().all(|c| c.is_zero()));
            let mut num = div[1].clone();
            for (c, x) in div[2..2 + full.len()].iter().zip(&full) {
                num += c * x;
            }
            full.push(num.div_floor(&div[0]));
        }
        self.eqs.iter().all(|r| seq::eval(r, &full).is_zero())
            && self.ineqs.iter().all(|r| !seq::eval(r, &full).is_negative())
    }

    // Inject into a larger div space; exp[k] is the position of div k in
    // the target div matrix.
    pub fn expand_divs(&self, divs: &[Vec<BigInt>], exp: &[usize]) -> BasicMap {
        assert_eq!(exp.len(), self.n_div());
        let dim = self.space.dim();
        let mut out = BasicMap::new(self.space, divs.len());
        let remap = |row: &[BigInt]| {
            let mut new_row = vec![BigInt::zero(); 1 + dim + divs.len()];
            new_row[..1 + dim].clone_from_slice(&row[..1 + dim]);
            for (k, &pos) in exp.iter().enumerate() {
                new_row[1 + dim + pos] = row[1 + dim + k].clone();
            }
            new_row
        };
        for row in &self.eqs {
            out.add_eq(remap(row));
        }
        for row in &self.ineqs {
            out.add_ineq(remap(row));
        }
        for (k, div) in divs.iter().enumerate() {
            out.set_div(k, div.clone());
        }
        if self.rational {
            out.set_rational();
        }
        out
    }

    // Swap divs k and k + 1, including their columns in every row.
    fn swap_divs(&mut self, k: usize) {
        let dim = self.space.dim();
        self.divs.swap(k, k + 1);
        for row in self.eqs.iter_mut().chain(self.ineqs.iter_mut()) {
            row.swap(1 + dim + k, 1 + dim + k + 1);
        }
        for div in self.divs.iter_mut() {
            div.swap(2 + dim + k, 2 + dim + k + 1);
        }
    }

    // Canonical div order, so basic maps over the same local space list
    // their divs identically. Only divs that do not reference each other
    // are reordered.
    pub fn sort_divs(&mut self) {
        let dim = self.space.dim();
        let n = self.divs.len();
        for _ in 0..n {
            let mut swapped = false;
            for k in 0..n.saturating_sub(1) {
                if self.divs[k + 1] < self.divs[k] && self.divs[k + 1][2 + dim + k].is_zero() {
                    self.swap_divs(k);
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
    }

    // Rebuild the constraints from the row states of a tableau: redundant
    // rows are dropped, pinned rows become equalities, relaxed constants
    // are taken over.
    pub fn updated_from_tab(&self, tab: &Tab) -> BasicMap {
        let mut out = BasicMap::new(self.space, self.n_div());
        for (k, div) in self.divs.iter().enumerate() {
            out.set_div(k, div.clone());
        }
        for idx in 0..tab.n_cons() {
            if tab.is_redundant(idx) || tab.is_unrestricted(idx) {
                continue;
            }
            let row = tab.row(idx).to_vec();
            if tab.is_equality(idx) {
                out.add_eq(row);
            } else {
                out.add_ineq(row);
            }
        }
        if self.rational {
            out.set_rational();
        }
        out
    }
}

impl std::fmt::Display for BasicMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn term(f: &mut std::fmt::Formatter<'_>, row: &[BigInt]) -> std::fmt::Result {
            write!(f, "{}", row[0])?;
            for (i, c) in row[1..].iter().enumerate() {
                if !num_traits::Zero::is_zero(c) {
                    write!(f, " + {}*x{}", c, i)?;
                }
            }
            Ok(())
        }
        write!(f, "{{ ")?;
        let mut first = true;
        for row in &self.eqs {
            if !first {
                write!(f, " and ")?;
            }
            term(f, row)?;
            write!(f, " = 0")?;
            first = false;
        }
        for row in &self.ineqs {
            if !first {
                write!(f, " and ")?;
            }
            term(f, row)?;
            write!(f, " >= 0")?;
            first = false;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&v| BigInt::from(v)).collect()
    }

    fn square(lo: i64, hi: i64) -> BasicMap {
        let mut bm = BasicMap::new(Space::set(0, 2), 0);
        bm.add_ineq(row(&[-lo, 1, 0]));
        bm.add_ineq(row(&[hi, -1, 0]));
        bm.add_ineq(row(&[-lo, 0, 1]));
        bm.add_ineq(row(&[hi, 0, -1]));
        bm
    }

    #[test]
    fn test_contains_point() {
        let bm = square(0, 5);
        assert!(bm.contains_point(&row(&[0, 0])));
        assert!(bm.contains_point(&row(&[5, 3])));
        assert!(!bm.contains_point(&row(&[6, 3])));
        assert!(!bm.contains_point(&row(&[-1, 0])));
    }

    #[test]
    fn test_gauss_substitutes() {
        // y = x + 1 and x + y >= 4 becomes 2x >= 3 after substitution
        let mut bm = BasicMap::new(Space::set(0, 2), 0);
        bm.add_eq(row(&[1, 1, -1]));
        bm.add_ineq(row(&[-4, 1, 1]));
        bm.gauss();
        assert_eq!(bm.n_eq(), 1);
        assert_eq!(bm.n_ineq(), 1);
        // the inequality no longer mentions y and is tightened over integers
        assert!(bm.ineq(0)[2].is_zero());
        assert_eq!(bm.ineq(0), &row(&[-2, 1, 0])[..]);
    }

    #[test]
    fn test_gauss_contradiction() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_eq(row(&[0, 1]));
        bm.add_eq(row(&[-1, 1]));
        bm.gauss();
        assert!(bm.is_empty());
    }

    #[test]
    fn test_detect_inequality_pairs() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[-2, 1]));
        bm.add_ineq(row(&[2, -1]));
        bm.detect_inequality_pairs();
        assert_eq!(bm.n_eq(), 1);
        assert_eq!(bm.n_ineq(), 0);
        assert_eq!(bm.eq(0), &row(&[-2, 1])[..]);
    }

    #[test]
    fn test_detect_inequality_pairs_empty() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[-3, 1]));
        bm.add_ineq(row(&[2, -1]));
        bm.detect_inequality_pairs();
        assert!(bm.is_empty());
    }

    #[test]
    fn test_finalize_normalizes() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[5, -2]));
        bm.finalize();
        // 5 - 2x >= 0 tightens to 2 - x >= 0 over the integers
        assert_eq!(bm.ineq(0), &row(&[2, -1])[..]);
        assert!(bm.is_finalized());
    }

    #[test]
    fn test_div_membership() {
        // even numbers: x = 2d with d = floor(x/2)
        let mut bm = BasicMap::new(Space::set(0, 1), 1);
        bm.set_div(0, row(&[2, 0, 1, 0]));
        bm.add_eq(row(&[0, 1, -2]));
        assert!(bm.contains_point(&row(&[4])));
        assert!(!bm.contains_point(&row(&[5])));
        assert!(bm.contains_point(&row(&[-2])));
        assert!(!bm.contains_point(&row(&[-3])));
    }

    #[test]
    fn test_sort_divs() {
        let mut bm = BasicMap::new(Space::set(0, 1), 2);
        bm.set_div(0, row(&[3, 0, 1, 0, 0]));
        bm.set_div(1, row(&[2, 0, 1, 0, 0]));
        // x = 2 * floor(x/2), referencing div 1
        bm.add_eq(row(&[0, 1, 0, -2]));
        bm.sort_divs();
        assert_eq!(bm.div(0), &row(&[2, 0, 1, 0, 0])[..]);
        assert_eq!(bm.div(1), &row(&[3, 0, 1, 0, 0])[..]);
        assert_eq!(bm.eq(0), &row(&[0, 1, -2, 0])[..]);
        assert!(bm.contains_point(&row(&[4])));
        assert!(!bm.contains_point(&row(&[5])));
    }

    #[test]
    fn test_expand_divs() {
        // x even, expanded into a space with an extra div in front
        let mut bm = BasicMap::new(Space::set(0, 1), 1);
        bm.set_div(0, row(&[2, 0, 1, 0]));
        bm.add_eq(row(&[0, 1, -2]));
        let divs = vec![row(&[3, 0, 1, 0, 0]), row(&[2, 0, 1, 0, 0])];
        let out = bm.expand_divs(&divs, &[1]);
        assert_eq!(out.n_div(), 2);
        assert_eq!(out.eq(0), &row(&[0, 1, 0, -2])[..]);
        assert!(out.contains_point(&row(&[4])));
        assert!(!out.contains_point(&row(&[3])));
    }
}
