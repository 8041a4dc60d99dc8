use num_bigint::BigInt;
use num_traits::Zero;

use crate::coalesce::Options;
use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::map::space::Space;
use crate::tab::lp::{self, Lp};
use crate::utils::seq;

/// A basic set is a basic map without input dimensions.
pub type BasicSet = BasicMap;

/// A finite union of basic maps over a common space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    space: Space,
    bmaps: Vec<BasicMap>,
}

impl Map {
    pub fn new(space: Space) -> Self {
        Map { space, bmaps: Vec::new() }
    }

    pub fn from_basic_maps(space: Space, bmaps: Vec<BasicMap>) -> Self {
        let mut map = Map::new(space);
        for bmap in bmaps {
            map.add_basic_map(bmap);
        }
        map
    }

    pub fn add_basic_map(&mut self, bmap: BasicMap) {
        assert_eq!(*bmap.space(), self.space);
        self.bmaps.push(bmap);
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn n_basic_maps(&self) -> usize {
        self.bmaps.len()
    }

    pub fn basic_maps(&self) -> impl Iterator<Item = &BasicMap> {
        self.bmaps.iter()
    }

    pub fn into_basic_maps(self) -> Vec<BasicMap> {
        self.bmaps
    }

    pub fn contains_point(&self, point: &[BigInt]) -> bool {
        self.bmaps.iter().any(|bm| bm.contains_point(point))
    }

    pub(crate) fn remove_empty_parts(&mut self) {
        self.bmaps.retain(|bm| !bm.is_empty());
    }

    pub(crate) fn sort_all_divs(&mut self) {
        for bm in self.bmaps.iter_mut() {
            bm.sort_divs();
        }
    }

    pub(crate) fn basic_maps_mut(&mut self) -> &mut Vec<BasicMap> {
        &mut self.bmaps
    }

    // Replace pairs of basic maps whose union is again a basic map until no
    // pair combines.
    pub fn coalesce(self) -> Result<Map, Error> {
        self.coalesce_with(&Options::default())
    }

    pub fn coalesce_with(self, options: &Options) -> Result<Map, Error> {
        crate::coalesce::coalesce_map(self, options)
    }
}

impl std::fmt::Display for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, bm) in self.bmaps.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            write!(f, "{}", bm)?;
        }
        Ok(())
    }
}

/// A finite union of basic sets; a thin view over [`Map`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    map: Map,
}

impl Set {
    pub fn new(space: Space) -> Self {
        assert_eq!(space.n_in(), 0);
        Set { map: Map::new(space) }
    }

    pub fn from_basic_sets(space: Space, bsets: Vec<BasicSet>) -> Self {
        let mut set = Set::new(space);
        for bset in bsets {
            set.add_basic_set(bset);
        }
        set
    }

    pub fn add_basic_set(&mut self, bset: BasicSet) {
        self.map.add_basic_map(bset);
    }

    pub fn space(&self) -> &Space {
        self.map.space()
    }

    pub fn n_basic_sets(&self) -> usize {
        self.map.n_basic_maps()
    }

    pub fn basic_sets(&self) -> impl Iterator<Item = &BasicSet> {
        self.map.basic_maps()
    }

    pub fn contains_point(&self, point: &[BigInt]) -> bool {
        self.map.contains_point(point)
    }

    pub fn coalesce(self) -> Result<Set, Error> {
        Ok(Set { map: self.map.coalesce()? })
    }

    pub fn coalesce_with(self, options: &Options) -> Result<Set, Error> {
        Ok(Set { map: self.map.coalesce_with(options)? })
    }

    pub fn wrap_facet(&self, bound: &[BigInt], ridge: &[BigInt]) -> Result<Vec<BigInt>, Error> {
        wrap_facet(&self.map.bmaps, bound, ridge)
    }
}

impl std::fmt::Display for Set {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.map)
    }
}

// Rotate bound around the ridge it shares with ridge until the half-space
// supports the union of parts: the result is ridge - a * bound with a the
// infimum of ridge(x) / bound(x) over bound(x) > 0, recession included.
// An unattained infimum returns the bound row unchanged; callers treat a
// result identical to bound as the failure signal.
pub(crate) fn wrap_facet(
    parts: &[BasicMap],
    bound: &[BigInt],
    ridge: &[BigInt],
) -> Result<Vec<BigInt>, Error> {
    use num_rational::BigRational;

    let n = bound.len() - 1;
    let mut best: Option<BigRational> = None;

    // rows over (x, w): [constant, x coefficients.., w coefficient]
    let homog = |row: &[BigInt]| {
        let mut h = Vec::with_capacity(2 + n);
        h.push(BigInt::zero());
        h.extend(row[1..].iter().cloned());
        h.push(row[0].clone());
        h
    };
    let mut nonneg_w = vec![BigInt::zero(); 2 + n];
    nonneg_w[1 + n] = BigInt::from(1);
    let mut bound_is_one = homog(bound);
    bound_is_one[0] = BigInt::from(-1);
    let obj = homog(ridge);

    for part in parts {
        debug_assert_eq!(part.total_dim(), n);
        let eq_rows: Vec<Vec<BigInt>> = part.eqs().map(homog).collect();
        let mut ineq_rows: Vec<Vec<BigInt>> = part.ineqs().map(homog).collect();
        ineq_rows.push(nonneg_w.clone());
        let mut eqs: Vec<&[BigInt]> = eq_rows.iter().map(|r| r.as_slice()).collect();
        eqs.push(&bound_is_one);
        let ineqs: Vec<&[BigInt]> = ineq_rows.iter().map(|r| r.as_slice()).collect();
        match lp::minimize(n + 1, &eqs, &ineqs, &obj)? {
            Lp::Empty => continue,
            Lp::Unbounded => return Ok(bound.to_vec()),
            Lp::Solution(a) => {
                if best.as_ref().is_none_or(|b| a < *b) {
                    best = Some(a);
                }
            }
        }
    }

    let Some(a) = best else {
        return Ok(bound.to_vec());
    };
    let mut row = seq::combine(a.denom(), ridge, &-a.numer(), bound);
    seq::normalize(&mut row);
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vals: &[i64]) -> Vec<BigInt> {
        vals.iter().map(|&v| BigInt::from(v)).collect()
    }

    fn rect(x0: i64, x1: i64, y0: i64, y1: i64) -> BasicSet {
        let mut bm = BasicMap::new(Space::set(0, 2), 0);
        bm.add_ineq(row(&[-x0, 1, 0]));
        bm.add_ineq(row(&[x1, -1, 0]));
        bm.add_ineq(row(&[-y0, 0, 1]));
        bm.add_ineq(row(&[y1, 0, -1]));
        bm
    }

    #[test]
    fn test_union_membership() {
        let set = Set::from_basic_sets(Space::set(0, 2), vec![rect(0, 2, 0, 2), rect(5, 6, 0, 2)]);
        assert!(set.contains_point(&row(&[1, 1])));
        assert!(set.contains_point(&row(&[5, 0])));
        assert!(!set.contains_point(&row(&[3, 1])));
    }

    #[test]
    fn test_wrap_facet_keeps_supporting_ridge() {
        // wrap 1 - y >= 0 around x >= 0 to contain the segment y = 0,
        // 0 <= x <= 5: the rotation is not needed, the ridge already holds
        let mut seg = BasicMap::new(Space::set(0, 2), 0);
        seg.add_eq(row(&[0, 0, 1]));
        seg.add_ineq(row(&[0, 1, 0]));
        seg.add_ineq(row(&[5, -1, 0]));
        let wrapped = wrap_facet(&[seg], &row(&[1, 0, -1]), &row(&[0, 1, 0])).unwrap();
        assert_eq!(wrapped, row(&[0, 1, 0]));
    }

    #[test]
    fn test_wrap_facet_rotates() {
        // wrap x >= 0 around y >= 0 to contain the segment x = 2,
        // -3 <= y <= 5: the rotation through the ridge (the origin) that
        // touches the segment at (2, -3) is 3x + 2y >= 0
        let mut seg = BasicMap::new(Space::set(0, 2), 0);
        seg.add_eq(row(&[-2, 1, 0]));
        seg.add_ineq(row(&[3, 0, 1]));
        seg.add_ineq(row(&[5, 0, -1]));
        let wrapped = wrap_facet(&[seg], &row(&[0, 1, 0]), &row(&[0, 0, 1])).unwrap();
        assert_eq!(wrapped, row(&[0, 3, 2]));
    }

    #[test]
    fn test_wrap_facet_unbounded() {
        // the ray y = 0, x >= 0 recedes along the ridge hyperplane, so no
        // rotation of 1 - y >= 0 towards -x >= 0 can support it
        let mut ray = BasicMap::new(Space::set(0, 2), 0);
        ray.add_eq(row(&[0, 0, 1]));
        ray.add_ineq(row(&[0, 1, 0]));
        let bound = row(&[1, 0, -1]);
        let wrapped = wrap_facet(&[ray], &bound, &row(&[0, -1, 0])).unwrap();
        assert_eq!(wrapped, bound);
    }
}
