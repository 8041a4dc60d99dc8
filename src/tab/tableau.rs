use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::tab::lp::{self, Lp};

// Position of an inequality f >= 0 relative to the tableau: redundant means
// it holds everywhere; adj_eq means the polyhedron lies on f = -1, adj_ineq
// that it lies in f <= -1 and touches that hyperplane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneqType {
    Redundant,
    Separate,
    Cut,
    AdjEq,
    AdjIneq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Con {
    row: Vec<BigInt>,
    eq: bool,           // pinned to its hyperplane
    redundant: bool,    // implied by the other rows, ignored from here on
    unrestricted: bool, // lifted, no longer constrains the polyhedron
}

#[derive(Debug, Clone)]
struct State {
    cons: Vec<Con>,
    rational: bool,
    empty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(usize);

// Rows are kept in basic-map order: equalities first, inequality k at index
// n_eq + k, added rows after. Queries answer against the active rows only;
// a row once found redundant stays ignored.
#[derive(Debug, Clone)]
pub struct Tab {
    n_var: usize,
    cons: Vec<Con>,
    rational: bool,
    empty: bool,
    snapshots: Vec<State>,
}

impl Tab {
    pub fn from_basic_map(bmap: &BasicMap) -> Result<Tab, Error> {
        let mut cons = Vec::with_capacity(bmap.n_eq() + bmap.n_ineq());
        for row in bmap.eqs() {
            cons.push(Con { row: row.to_vec(), eq: true, redundant: false, unrestricted: false });
        }
        for row in bmap.ineqs() {
            cons.push(Con { row: row.to_vec(), eq: false, redundant: false, unrestricted: false });
        }
        let mut tab = Tab {
            n_var: bmap.total_dim(),
            cons,
            rational: bmap.is_rational(),
            empty: bmap.is_empty(),
            snapshots: Vec::new(),
        };
        if !tab.empty {
            tab.empty = !tab.feasible()?;
        }
        Ok(tab)
    }

    pub fn n_var(&self) -> usize {
        self.n_var
    }

    pub fn n_cons(&self) -> usize {
        self.cons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn is_rational(&self) -> bool {
        self.rational
    }

    pub fn mark_rational(&mut self) {
        self.rational = true;
    }

    pub fn row(&self, idx: usize) -> &[BigInt] {
        &self.cons[idx].row
    }

    pub fn is_redundant(&self, idx: usize) -> bool {
        self.cons[idx].redundant
    }

    pub fn is_equality(&self, idx: usize) -> bool {
        self.cons[idx].eq
    }

    pub fn is_unrestricted(&self, idx: usize) -> bool {
        self.cons[idx].unrestricted
    }

    pub fn snap(&mut self) -> Snapshot {
        self.snapshots.push(State {
            cons: self.cons.clone(),
            rational: self.rational,
            empty: self.empty,
        });
        Snapshot(self.snapshots.len() - 1)
    }

    // Later snapshots are discarded; the token itself stays valid for
    // further rollbacks.
    pub fn rollback(&mut self, snap: Snapshot) -> Result<(), Error> {
        let Some(state) = self.snapshots.get(snap.0) else {
            return Err(Error::Tableau("rollback to a discarded snapshot"));
        };
        self.cons = state.cons.clone();
        self.rational = state.rational;
        self.empty = state.empty;
        self.snapshots.truncate(snap.0 + 1);
        Ok(())
    }

    fn active(&self) -> (Vec<&[BigInt]>, Vec<&[BigInt]>) {
        let mut eqs = Vec::new();
        let mut ineqs = Vec::new();
        for con in &self.cons {
            if con.redundant || con.unrestricted {
                continue;
            }
            if con.eq {
                eqs.push(con.row.as_slice());
            } else {
                ineqs.push(con.row.as_slice());
            }
        }
        (eqs, ineqs)
    }

    fn feasible(&self) -> Result<bool, Error> {
        let (eqs, ineqs) = self.active();
        let zero = vec![BigInt::zero(); 1 + self.n_var];
        Ok(lp::minimize(self.n_var, &eqs, &ineqs, &zero)? != Lp::Empty)
    }

    pub fn min(&self, row: &[BigInt]) -> Result<Lp, Error> {
        let (eqs, ineqs) = self.active();
        lp::minimize(self.n_var, &eqs, &ineqs, row)
    }

    pub fn max(&self, row: &[BigInt]) -> Result<Lp, Error> {
        let (eqs, ineqs) = self.active();
        lp::maximize(self.n_var, &eqs, &ineqs, row)
    }

    pub fn ineq_type(&self, row: &[BigInt]) -> Result<IneqType, Error> {
        if self.empty {
            return Err(Error::Tableau("classification against an empty tableau"));
        }
        let min = match self.min(row)? {
            Lp::Empty => return Err(Error::Tableau("active rows became infeasible")),
            Lp::Unbounded => None,
            Lp::Solution(m) => {
                if !m.is_negative() {
                    return Ok(IneqType::Redundant);
                }
                Some(m)
            }
        };
        let max = match self.max(row)? {
            Lp::Empty => return Err(Error::Tableau("active rows became infeasible")),
            Lp::Unbounded => return Ok(IneqType::Cut),
            Lp::Solution(m) => m,
        };
        if !max.is_negative() {
            return Ok(IneqType::Cut);
        }
        if self.rational {
            return Ok(IneqType::Separate);
        }
        let minus_one = -BigRational::one();
        if max == minus_one {
            if min == Some(minus_one) {
                Ok(IneqType::AdjEq)
            } else {
                Ok(IneqType::AdjIneq)
            }
        } else {
            Ok(IneqType::Separate)
        }
    }

    pub fn detect_redundant(&mut self) -> Result<(), Error> {
        if self.empty {
            return Ok(());
        }
        for idx in 0..self.cons.len() {
            let con = &self.cons[idx];
            if con.eq || con.redundant || con.unrestricted {
                continue;
            }
            self.cons[idx].redundant = true;
            let min = self.min(&self.cons[idx].row.clone())?;
            let implied = matches!(min, Lp::Solution(ref m) if !m.is_negative());
            self.cons[idx].redundant = implied;
        }
        Ok(())
    }

    pub fn detect_implicit_equalities(&mut self) -> Result<(), Error> {
        if self.empty {
            return Ok(());
        }
        for idx in 0..self.cons.len() {
            let con = &self.cons[idx];
            if con.eq || con.redundant || con.unrestricted {
                continue;
            }
            let max = self.max(&con.row.clone())?;
            if matches!(max, Lp::Solution(ref m) if m.is_zero()) {
                self.cons[idx].eq = true;
            }
        }
        Ok(())
    }

    pub fn any_implicit_equality(&self, n_eq: usize) -> bool {
        self.cons[n_eq..].iter().any(|c| c.eq)
    }

    pub fn select_facet(&mut self, idx: usize) -> Result<(), Error> {
        if self.cons[idx].redundant || self.cons[idx].unrestricted {
            return Err(Error::Tableau("cannot select a facet of an inactive row"));
        }
        self.cons[idx].eq = true;
        Ok(())
    }

    pub fn relax(&mut self, idx: usize) -> Result<(), Error> {
        if self.cons[idx].redundant || self.cons[idx].unrestricted {
            return Err(Error::Tableau("cannot relax an inactive row"));
        }
        self.cons[idx].row[0] += 1;
        Ok(())
    }

    pub fn unrestrict(&mut self, idx: usize) -> Result<(), Error> {
        self.cons[idx].unrestricted = true;
        Ok(())
    }

    pub fn add_ineq(&mut self, row: &[BigInt]) -> Result<(), Error> {
        if row.len() != 1 + self.n_var {
            return Err(Error::Dim { expected: 1 + self.n_var, got: row.len() });
        }
        self.cons.push(Con {
            row: row.to_vec(),
            eq: false,
            redundant: false,
            unrestricted: false,
        });
        if !self.empty {
            self.empty = !self.feasible()?;
        }
        Ok(())
    }

    pub fn add_eq(&mut self, row: &[BigInt]) -> Result<(), Error> {
        if row.len() != 1 + self.n_var {
            return Err(Error::Dim { expected: 1 + self.n_var, got: row.len() });
        }
        self.cons.push(Con {
            row: row.to_vec(),
            eq: true,
            redundant: false,
            unrestricted: false,
        });
        if !self.empty {
            self.empty = !self.feasible()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::space::Space;

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
    fn test_classification() {
        let tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        assert!(!tab.is_empty());
        // x + 1 >= 0 holds everywhere on the square
        assert_eq!(tab.ineq_type(&row(&[1, 1, 0])).unwrap(), IneqType::Redundant);
        // x - 3 >= 0 cuts it
        assert_eq!(tab.ineq_type(&row(&[-3, 1, 0])).unwrap(), IneqType::Cut);
        // x - 7 >= 0 misses it by two
        assert_eq!(tab.ineq_type(&row(&[-7, 1, 0])).unwrap(), IneqType::Separate);
        // x - 6 >= 0 misses it by exactly one
        assert_eq!(tab.ineq_type(&row(&[-6, 1, 0])).unwrap(), IneqType::AdjIneq);
    }

    #[test]
    fn test_adj_eq() {
        // the line y = 5, 0 <= x <= 5
        let mut bm = BasicMap::new(Space::set(0, 2), 0);
        bm.add_eq(row(&[-5, 0, 1]));
        bm.add_ineq(row(&[0, 1, 0]));
        bm.add_ineq(row(&[5, -1, 0]));
        let tab = Tab::from_basic_map(&bm).unwrap();
        // y - 6 >= 0 is adjacent to the whole line
        assert_eq!(tab.ineq_type(&row(&[-6, 0, 1])).unwrap(), IneqType::AdjEq);
        // 4 - y >= 0 likewise, from below
        assert_eq!(tab.ineq_type(&row(&[4, 0, -1])).unwrap(), IneqType::AdjEq);
    }

    #[test]
    fn test_rational_has_no_adjacency() {
        let mut tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        tab.mark_rational();
        assert_eq!(tab.ineq_type(&row(&[-6, 1, 0])).unwrap(), IneqType::Separate);
    }

    #[test]
    fn test_empty_detection() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[-1, 1]));
        bm.add_ineq(row(&[0, -1]));
        let tab = Tab::from_basic_map(&bm).unwrap();
        assert!(tab.is_empty());
    }

    #[test]
    fn test_detect_redundant() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[0, 1]));
        bm.add_ineq(row(&[5, -1]));
        bm.add_ineq(row(&[10, -1]));
        let mut tab = Tab::from_basic_map(&bm).unwrap();
        tab.detect_redundant().unwrap();
        assert!(!tab.is_redundant(0));
        assert!(!tab.is_redundant(1));
        assert!(tab.is_redundant(2));
    }

    #[test]
    fn test_detect_redundant_keeps_one_of_a_duplicate() {
        let mut bm = BasicMap::new(Space::set(0, 1), 0);
        bm.add_ineq(row(&[0, 1]));
        bm.add_ineq(row(&[0, 1]));
        let mut tab = Tab::from_basic_map(&bm).unwrap();
        tab.detect_redundant().unwrap();
        assert!(tab.is_redundant(0) ^ tab.is_redundant(1));
    }

    #[test]
    fn test_detect_implicit_equalities() {
        let mut bm = BasicMap::new(Space::set(0, 2), 0);
        bm.add_ineq(row(&[0, 1, 0]));
        bm.add_ineq(row(&[0, -1, 0]));
        bm.add_ineq(row(&[3, 0, -1]));
        bm.add_ineq(row(&[0, 0, 1]));
        let mut tab = Tab::from_basic_map(&bm).unwrap();
        tab.detect_implicit_equalities().unwrap();
        assert!(tab.is_equality(0));
        assert!(tab.is_equality(1));
        assert!(!tab.is_equality(2));
        assert!(!tab.is_equality(3));
    }

    #[test]
    fn test_snapshot_rollback() {
        let mut tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        let snap = tab.snap();
        tab.add_ineq(&row(&[-3, 1, 0])).unwrap();
        tab.select_facet(0).unwrap();
        tab.mark_rational();
        assert_eq!(tab.n_cons(), 5);
        tab.rollback(snap).unwrap();
        assert_eq!(tab.n_cons(), 4);
        assert!(!tab.is_equality(0));
        assert!(!tab.is_rational());
        // the same token can be rolled back to again
        tab.relax(1).unwrap();
        tab.rollback(snap).unwrap();
        assert_eq!(tab.row(1), &row(&[5, -1, 0])[..]);
    }

    #[test]
    fn test_select_facet_restricts() {
        let mut tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        // saturate x <= 5, then 4 - x >= 0 separates instead of cutting
        tab.select_facet(1).unwrap();
        assert_eq!(tab.ineq_type(&row(&[-4, 1, 0])).unwrap(), IneqType::Redundant);
        assert_eq!(tab.ineq_type(&row(&[4, -1, 0])).unwrap(), IneqType::AdjEq);
    }

    #[test]
    fn test_relax_and_unrestrict() {
        let mut tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        // relax x <= 5 to x <= 6
        tab.relax(1).unwrap();
        assert_eq!(tab.ineq_type(&row(&[-6, 1, 0])).unwrap(), IneqType::Cut);
        // lift x >= 0 entirely
        tab.unrestrict(0).unwrap();
        assert_eq!(tab.ineq_type(&row(&[0, 1, 0])).unwrap(), IneqType::Cut);
    }

    #[test]
    fn test_add_eq_can_empty() {
        let mut tab = Tab::from_basic_map(&square(0, 5)).unwrap();
        tab.add_eq(&row(&[-7, 1, 0])).unwrap();
        assert!(tab.is_empty());
    }
}
