use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::coalesce::driver::{Live, Options};
use crate::coalesce::status::Status;
use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::map::map::wrap_facet;
use crate::tab::tableau::{IneqType, Tab};
use crate::utils::mat::Mat;
use crate::utils::seq;

// Candidate wrapping rows for one coalescing attempt. A wrapping failure
// clears the matrix, the signal that the attempt cannot proceed. With
// `bounded` set, `max` holds the largest absolute coefficient among the
// constraints the fusion would drop, and any wrapping row exceeding it is
// rejected.
pub(crate) struct Wraps {
    mat: Mat,
    bounded: bool,
    max: BigInt,
}

impl Wraps {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_col: usize,
        options: &Options,
        live_i: &Live,
        eq_i: &[Status],
        ineq_i: &[Status],
        live_j: &Live,
        eq_j: &[Status],
        ineq_j: &[Status],
    ) -> Wraps {
        let mut wraps = Wraps {
            mat: Mat::new(n_col),
            bounded: options.bounded_wrapping,
            max: BigInt::zero(),
        };
        if wraps.bounded {
            wraps.update_max(&live_i.bmap, eq_i, ineq_i);
            wraps.update_max(&live_j.bmap, eq_j, ineq_j);
        }
        wraps
    }

    fn update_max(&mut self, bmap: &BasicMap, eq: &[Status], ineq: &[Status]) {
        for (k, row) in bmap.eqs().enumerate() {
            if eq[2 * k] == Status::Valid && eq[2 * k + 1] == Status::Valid {
                continue;
            }
            let m = seq::abs_max(&row[1..]);
            if m > self.max {
                self.max = m;
            }
        }
        for (k, row) in bmap.ineqs().enumerate() {
            if ineq[k] == Status::Valid || ineq[k] == Status::Redundant {
                continue;
            }
            let m = seq::abs_max(&row[1..]);
            if m > self.max {
                self.max = m;
            }
        }
    }

    fn allow(&self, row: &[BigInt]) -> bool {
        !self.bounded || row[1..].iter().all(|c| c.abs() <= self.max)
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn n_row(&self) -> usize {
        self.mat.n_row()
    }

    pub fn push(&mut self, row: Vec<BigInt>) {
        self.mat.push(row);
    }

    // Wrap bound around every active constraint of live such that the
    // result still contains set, appending the wrapped rows. Constraints
    // parallel or opposite to bound are skipped, equalities wrap in both
    // directions.
    pub fn add_wraps(
        &mut self,
        live: &Live,
        bound: &[BigInt],
        set: &[BasicMap],
    ) -> Result<(), Error> {
        let n_eq = live.bmap.n_eq();
        for (l, ineq) in live.bmap.ineqs().enumerate() {
            if seq::is_neg(bound, ineq) || bound == ineq {
                continue;
            }
            if live.tab.is_redundant(n_eq + l) {
                continue;
            }
            let row = wrap_facet(set, bound, ineq)?;
            if row == bound || !self.allow(&row) {
                self.mat.clear();
                return Ok(());
            }
            self.mat.push(row);
        }
        for eq in live.bmap.eqs() {
            if seq::is_neg(bound, eq) || bound == eq {
                continue;
            }
            let neg = seq::neg(eq);
            for ridge in [neg.as_slice(), eq] {
                let row = wrap_facet(set, bound, ridge)?;
                if row == bound || !self.allow(&row) {
                    self.mat.clear();
                    return Ok(());
                }
                self.mat.push(row);
            }
        }
        Ok(())
    }

    // Verify that rows first.. hold on the basic map represented by tab;
    // clear the matrix otherwise.
    pub fn check_wraps(&mut self, first: usize, tab: &Tab) -> Result<(), Error> {
        for idx in first..self.mat.n_row() {
            if tab.ineq_type(self.mat.row(idx))? == IneqType::Redundant {
                continue;
            }
            self.mat.clear();
            return Ok(());
        }
        Ok(())
    }
}

// The redundant rows must be dropped here: a redundant constraint is
// ignored when another row is relaxed, and a wrapping problem posed against
// the original rows could be blocked by it.
pub(crate) fn set_from_updated(live: &Live) -> BasicMap {
    live.bmap.updated_from_tab(&live.tab)
}
