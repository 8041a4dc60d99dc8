use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

// A constraint row is laid out as [constant, coefficients..].

pub fn neg(row: &[BigInt]) -> Vec<BigInt> {
    row.iter().map(|c| -c).collect()
}

pub fn is_neg(a: &[BigInt], b: &[BigInt]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| *x == -y)
}

pub fn eval(row: &[BigInt], point: &[BigInt]) -> BigInt {
    let mut acc = row[0].clone();
    for (c, x) in row[1..].iter().zip(point) {
        acc += c * x;
    }
    acc
}

pub fn abs_max(coeffs: &[BigInt]) -> BigInt {
    let mut max = BigInt::zero();
    for c in coeffs {
        let a = c.abs();
        if a > max {
            max = a;
        }
    }
    max
}

fn gcd_of(values: &[BigInt]) -> BigInt {
    let mut g = BigInt::zero();
    for v in values {
        g = g.gcd(v);
    }
    g
}

pub fn normalize(row: &mut [BigInt]) {
    let g = gcd_of(row);
    if g > BigInt::from(1) {
        for v in row.iter_mut() {
            *v = &*v / &g;
        }
    }
}

// g*c + k >= 0 over the integers is c + floor(k/g) >= 0
pub fn normalize_ineq(row: &mut [BigInt]) {
    let g = gcd_of(&row[1..]);
    if g > BigInt::from(1) {
        let tightened = row[0].div_floor(&g);
        row[0] = tightened;
        for v in row[1..].iter_mut() {
            *v = &*v / &g;
        }
    }
}

pub fn combine(a_scale: &BigInt, a: &[BigInt], b_scale: &BigInt, b: &[BigInt]) -> Vec<BigInt> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| a_scale * x + b_scale * y).collect()
}

pub fn is_zero(row: &[BigInt]) -> bool {
    row.iter().all(|c| c.is_zero())
}
