use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lp {
    Solution(BigRational),
    Unbounded,
    Empty,
}

// Minimize obj over {x : eq rows = 0, ineq rows >= 0}, free variables,
// exact arithmetic. The objective constant is included in the optimum.
pub fn minimize(
    n: usize,
    eqs: &[&[BigInt]],
    ineqs: &[&[BigInt]],
    obj: &[BigInt],
) -> Result<Lp, Error> {
    if obj.len() != 1 + n {
        return Err(Error::Dim { expected: 1 + n, got: obj.len() });
    }
    for row in eqs.iter().chain(ineqs) {
        if row.len() != 1 + n {
            return Err(Error::Dim { expected: 1 + n, got: row.len() });
        }
    }
    Ok(Simplex::new(n, eqs, ineqs).minimize(obj))
}

pub fn maximize(
    n: usize,
    eqs: &[&[BigInt]],
    ineqs: &[&[BigInt]],
    obj: &[BigInt],
) -> Result<Lp, Error> {
    let neg: Vec<BigInt> = obj.iter().map(|c| -c).collect();
    Ok(match minimize(n, eqs, ineqs, &neg)? {
        Lp::Solution(v) => Lp::Solution(-v),
        other => other,
    })
}

// Two-phase dense simplex with Bland's rule. Free variables are split into
// differences of nonnegatives, each inequality gets a slack and each row a
// phase-one artificial.
struct Simplex {
    rows: Vec<Vec<BigRational>>, // n_col + 1 entries each, rhs last (kept nonnegative)
    basis: Vec<usize>,
    n_var: usize,
    n_col: usize,
    art0: usize, // first artificial column
}

impl Simplex {
    fn new(n: usize, eqs: &[&[BigInt]], ineqs: &[&[BigInt]]) -> Self {
        let m = eqs.len() + ineqs.len();
        let n_slack = ineqs.len();
        let art0 = 2 * n + n_slack;
        let n_col = art0 + m;

        let mut rows = Vec::with_capacity(m);
        let mut basis = Vec::with_capacity(m);
        for (r, row) in eqs.iter().chain(ineqs).enumerate() {
            let is_ineq = r >= eqs.len();
            let mut line = vec![BigRational::zero(); n_col + 1];
            for i in 0..n {
                let c = BigRational::from(row[1 + i].clone());
                line[n + i] = -&c;
                line[i] = c;
            }
            if is_ineq {
                line[2 * n + (r - eqs.len())] = -BigRational::one();
            }
            // constant + coeffs · x (- slack) = 0, so the rhs is -constant
            line[n_col] = BigRational::from(-row[0].clone());
            if line[n_col].is_negative() {
                for v in line.iter_mut() {
                    *v = -&*v;
                }
            }
            line[art0 + r] = BigRational::one();
            rows.push(line);
            basis.push(art0 + r);
        }

        Simplex { rows, basis, n_var: n, n_col, art0 }
    }

    fn pivot(&mut self, r: usize, c: usize, cost: &mut [BigRational]) {
        let piv = self.rows[r][c].clone();
        for v in self.rows[r].iter_mut() {
            *v = &*v / &piv;
        }
        for i in 0..self.rows.len() {
            if i == r {
                continue;
            }
            let f = self.rows[i][c].clone();
            if f.is_zero() {
                continue;
            }
            for j in 0..=self.n_col {
                let d = &f * &self.rows[r][j];
                self.rows[i][j] -= d;
            }
        }
        let f = cost[c].clone();
        if !f.is_zero() {
            for j in 0..=self.n_col {
                let d = &f * &self.rows[r][j];
                cost[j] -= d;
            }
        }
        self.basis[r] = c;
    }

    // Pivot until no reduced cost is negative; columns from `limit` on
    // never enter. Returns false on unboundedness.
    fn optimize(&mut self, cost: &mut [BigRational], limit: usize) -> bool {
        loop {
            let Some(enter) = (0..limit).find(|&j| cost[j].is_negative()) else {
                return true;
            };
            let mut leave: Option<usize> = None;
            for r in 0..self.rows.len() {
                if !self.rows[r][enter].is_positive() {
                    continue;
                }
                let better = match leave {
                    None => true,
                    Some(l) => {
                        let a = &self.rows[r][self.n_col] * &self.rows[l][enter];
                        let b = &self.rows[l][self.n_col] * &self.rows[r][enter];
                        a < b || (a == b && self.basis[r] < self.basis[l])
                    }
                };
                if better {
                    leave = Some(r);
                }
            }
            let Some(leave) = leave else {
                return false;
            };
            self.pivot(leave, enter, cost);
        }
    }

    fn reduced_costs(&self, col_cost: impl Fn(usize) -> BigRational) -> Vec<BigRational> {
        let mut cost = vec![BigRational::zero(); self.n_col + 1];
        for (j, c) in cost.iter_mut().enumerate().take(self.n_col) {
            *c = col_cost(j);
        }
        for r in 0..self.rows.len() {
            let cb = col_cost(self.basis[r]);
            if cb.is_zero() {
                continue;
            }
            for j in 0..=self.n_col {
                let d = &cb * &self.rows[r][j];
                cost[j] -= d;
            }
        }
        cost
    }

    fn minimize(mut self, obj: &[BigInt]) -> Lp {
        let art0 = self.art0;

        // Phase one: minimize the sum of the artificials.
        let mut cost = self.reduced_costs(|j| {
            if j >= art0 { BigRational::one() } else { BigRational::zero() }
        });
        self.optimize(&mut cost, self.n_col);
        // cost[n_col] tracks the negated objective value
        if cost[self.n_col].is_negative() {
            return Lp::Empty;
        }

        // Drive remaining artificials out of the basis; rows that cannot
        // pivot are redundant and dropped.
        let mut r = 0;
        while r < self.rows.len() {
            if self.basis[r] < art0 {
                r += 1;
                continue;
            }
            match (0..art0).find(|&j| !self.rows[r][j].is_zero()) {
                Some(c) => {
                    self.pivot(r, c, &mut cost);
                    r += 1;
                }
                None => {
                    self.rows.swap_remove(r);
                    self.basis.swap_remove(r);
                }
            }
        }

        // Phase two: the real objective over the original variables.
        let n = self.n_var;
        let mut cost = self.reduced_costs(|j| {
            if j < n {
                BigRational::from(obj[1 + j].clone())
            } else if j < 2 * n {
                BigRational::from(-obj[1 + j - n].clone())
            } else {
                BigRational::zero()
            }
        });
        if !self.optimize(&mut cost, art0) {
            return Lp::Unbounded;
        }
        Lp::Solution(BigRational::from(obj[0].clone()) - cost[self.n_col].clone())
    }
}
