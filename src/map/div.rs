use num_bigint::BigInt;
use num_traits::Zero;

use crate::map::basic::BasicMap;

// Embed the divs of bmap_i into those of bmap_j: exp[k] is the position of
// div k within bmap_j. Fails unless every div of bmap_i is known and occurs
// in bmap_j, with references to earlier divs remapped.
pub fn align_divs(bmap_i: &BasicMap, bmap_j: &BasicMap) -> Option<Vec<usize>> {
    let dim = bmap_i.space().dim();
    let mut exp: Vec<usize> = Vec::with_capacity(bmap_i.n_div());
    for k in 0..bmap_i.n_div() {
        let div_i = bmap_i.div(k);
        if div_i[0].is_zero() {
            return None;
        }
        let pos = (0..bmap_j.n_div())
            .find(|&l| !exp.contains(&l) && div_matches(div_i, bmap_j.div(l), dim, &exp))?;
        exp.push(pos);
    }
    Some(exp)
}

fn div_matches(div_i: &[BigInt], div_j: &[BigInt], dim: usize, exp: &[usize]) -> bool {
    if div_j[0].is_zero() || div_i[..2 + dim] != div_j[..2 + dim] {
        return false;
    }
    // a div only references divs defined before it
    if div_i[2 + dim + exp.len()..].iter().any(|c| !c.is_zero()) {
        return false;
    }
    let mut expected = vec![BigInt::zero(); div_j.len() - (2 + dim)];
    for (t, &pos) in exp.iter().enumerate() {
        expected[pos] = div_i[2 + dim + t].clone();
    }
    div_j[2 + dim..] == expected[..]
}

// Same local space means identical known divs.
pub fn same_divs(bmap_i: &BasicMap, bmap_j: &BasicMap) -> bool {
    if bmap_i.n_div() != bmap_j.n_div() {
        return false;
    }
    if bmap_i.n_div() == 0 {
        return true;
    }
    if !bmap_i.divs_known() || !bmap_j.divs_known() {
        return false;
    }
    bmap_i.divs().zip(bmap_j.divs()).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::space::Space;

    fn row(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&v| BigInt::from(v)).collect()
    }

    #[test]
    fn test_same_divs() {
        let mut a = BasicMap::new(Space::set(0, 1), 1);
        a.set_div(0, row(&[2, 0, 1, 0]));
        let mut b = BasicMap::new(Space::set(0, 1), 1);
        b.set_div(0, row(&[2, 0, 1, 0]));
        assert!(same_divs(&a, &b));
        b.set_div(0, row(&[3, 0, 1, 0]));
        assert!(!same_divs(&a, &b));
    }

    #[test]
    fn test_align_divs_subset() {
        // a has floor(x/2); b has floor(x/3) and floor(x/2)
        let mut a = BasicMap::new(Space::set(0, 1), 1);
        a.set_div(0, row(&[2, 0, 1, 0]));
        let mut b = BasicMap::new(Space::set(0, 1), 2);
        b.set_div(0, row(&[3, 0, 1, 0, 0]));
        b.set_div(1, row(&[2, 0, 1, 0, 0]));
        assert_eq!(align_divs(&a, &b), Some(vec![1]));
    }

    #[test]
    fn test_align_divs_missing() {
        let mut a = BasicMap::new(Space::set(0, 1), 1);
        a.set_div(0, row(&[5, 0, 1, 0]));
        let mut b = BasicMap::new(Space::set(0, 1), 1);
        b.set_div(0, row(&[2, 0, 1, 0]));
        assert_eq!(align_divs(&a, &b), None);
    }

    #[test]
    fn test_align_divs_remaps_references() {
        // a: d0 = floor(x/2), d1 = floor((x + d0)/3)
        let mut a = BasicMap::new(Space::set(0, 1), 2);
        a.set_div(0, row(&[2, 0, 1, 0, 0]));
        a.set_div(1, row(&[3, 0, 1, 1, 0]));
        // b lists an unrelated div first
        let mut b = BasicMap::new(Space::set(0, 1), 3);
        b.set_div(0, row(&[7, 0, 1, 0, 0, 0]));
        b.set_div(1, row(&[2, 0, 1, 0, 0, 0]));
        b.set_div(2, row(&[3, 0, 1, 0, 1, 0]));
        assert_eq!(align_divs(&a, &b), Some(vec![1, 2]));
    }
}
