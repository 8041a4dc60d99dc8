use num_bigint::BigInt;

use crate::coalesce::driver::{Info, Live, Options, live_pair, live_pair_mut};
use crate::coalesce::status::{Status, all, any, contains, count, eq_status_in, ineq_status_in, status_in};
use crate::coalesce::wraps::{Wraps, set_from_updated};
use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::map::div;
use crate::tab::tableau::{IneqType, Tab};
use crate::utils::mat::Mat;
use crate::utils::seq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    None,
    DropFirst,
    DropSecond,
    Fuse,
}

// Replace the pair by the basic map bounded by the valid constraints of
// both sides plus the rows of extra; the result takes the smaller index.
// An equality is kept only if both its directions are valid.
#[allow(clippy::too_many_arguments)]
fn fuse(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: Option<&[Status]>,
    ineq_i: &[Status],
    eq_j: Option<&[Status]>,
    ineq_j: &[Status],
    extra: Option<&Mat>,
    detect_equalities: bool,
) -> Result<Change, Error> {
    if j < i {
        return fuse(j, i, info, eq_j, ineq_j, eq_i, ineq_i, extra, detect_equalities);
    }
    let (live_i, live_j) = live_pair(info, i, j);
    let mut fused = BasicMap::new(*live_i.bmap.space(), live_i.bmap.n_div());

    let keep_eq = |statuses: Option<&[Status]>, k: usize| match statuses {
        Some(st) => st[2 * k] == Status::Valid && st[2 * k + 1] == Status::Valid,
        None => true,
    };
    for (k, eq) in live_i.bmap.eqs().enumerate() {
        if keep_eq(eq_i, k) {
            fused.add_eq(eq.to_vec());
        }
    }
    for (k, eq) in live_j.bmap.eqs().enumerate() {
        if keep_eq(eq_j, k) {
            fused.add_eq(eq.to_vec());
        }
    }
    for (k, ineq) in live_i.bmap.ineqs().enumerate() {
        if ineq_i[k] == Status::Valid {
            fused.add_ineq(ineq.to_vec());
        }
    }
    for (k, ineq) in live_j.bmap.ineqs().enumerate() {
        if ineq_j[k] == Status::Valid {
            fused.add_ineq(ineq.to_vec());
        }
    }
    for (k, div) in live_i.bmap.divs().enumerate() {
        fused.set_div(k, div.to_vec());
    }
    if let Some(extra) = extra {
        for row in extra.rows() {
            fused.add_ineq(row.to_vec());
        }
    }

    if detect_equalities {
        fused.detect_inequality_pairs();
    }
    if live_i.bmap.is_rational() && live_j.bmap.is_rational() {
        fused.set_rational();
    }
    fused.gauss();
    fused.mark_final();

    let mut fused_tab = Tab::from_basic_map(&fused)?;
    fused_tab.detect_redundant()?;

    info[i].replace(fused, fused_tab);
    info[j].drop_entry();
    tracing::trace!(i, j, "fused pair");
    Ok(Change::Fuse)
}

// All constraints are valid or cut; fuse if every cut facet of i lies
// entirely inside j. The facet containment must hold rationally, so the
// checks run on a tableau marked rational.
fn check_facets(
    i: usize,
    j: usize,
    info: &mut [Info],
    ineq_i: &[Status],
    ineq_j: &[Status],
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_eq = live_i.bmap.n_eq();
    let snap = live_i.tab.snap();
    live_i.tab.mark_rational();
    let snap2 = live_i.tab.snap();

    let mut all_facets_inside = true;
    for k in 0..live_i.bmap.n_ineq() {
        if ineq_i[k] != Status::Cut {
            continue;
        }
        live_i.tab.select_facet(n_eq + k)?;
        let mut facet_inside = true;
        for l in 0..live_j.bmap.n_ineq() {
            if ineq_j[l] != Status::Cut {
                continue;
            }
            if status_in(live_j.bmap.ineq(l), &live_i.tab)? != Status::Valid {
                facet_inside = false;
                break;
            }
        }
        live_i.tab.rollback(snap2)?;
        if !facet_inside {
            all_facets_inside = false;
            break;
        }
    }

    if !all_facets_inside {
        live_i.tab.rollback(snap)?;
        return Ok(Change::None);
    }
    fuse(i, j, info, None, ineq_i, None, ineq_j, None, false)
}

// i has exactly one inequality f >= 0 adjacent to an inequality of j, the
// rest valid for j. Replace it by f <= -1, add the valid inequalities of j
// and fuse if j contains the result. No rollback is needed on success, the
// tableau is replaced by the fusion.
fn is_adj_ineq_extension(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_eq = live_i.bmap.n_eq();
    let k = ineq_i
        .iter()
        .position(|&s| s == Status::AdjIneq)
        .ok_or(Error::Internal("expected an adjacent inequality"))?;

    let snap = live_i.tab.snap();
    live_i.tab.unrestrict(n_eq + k)?;
    let mut opposite = seq::neg(live_i.bmap.ineq(k));
    opposite[0] -= 1;
    live_i.tab.add_ineq(&opposite)?;
    for (l, ineq) in live_j.bmap.ineqs().enumerate() {
        if ineq_j[l] != Status::Valid {
            continue;
        }
        live_i.tab.add_ineq(ineq)?;
    }

    if contains(&live_j.bmap, ineq_j, &live_i.tab)? {
        return fuse(i, j, info, Some(eq_i), ineq_i, Some(eq_j), ineq_j, None, false);
    }
    let live_i = info[i].live_mut();
    live_i.tab.rollback(snap)?;
    Ok(Change::None)
}

// Both sides have an inequality adjacent to an opposite inequality of the
// other. With no cuts and a single adjacency per side the pair fuses
// directly; any point gained lies strictly between the adjacent
// hyperplanes and cannot be integral. With cuts on one side only, the
// other side may still absorb the pair as an extension.
fn check_adj_ineq(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
) -> Result<Change, Error> {
    let count_i = count(ineq_i, Status::AdjIneq);
    let count_j = count(ineq_j, Status::AdjIneq);

    if count_i != 1 && count_j != 1 {
        return Ok(Change::None);
    }

    let cut_i = any(eq_i, Status::Cut) || any(ineq_i, Status::Cut);
    let cut_j = any(eq_j, Status::Cut) || any(ineq_j, Status::Cut);

    if !cut_i && !cut_j && count_i == 1 && count_j == 1 {
        return fuse(i, j, info, None, ineq_i, None, ineq_j, None, false);
    }
    if count_i == 1 && !cut_i {
        return is_adj_ineq_extension(i, j, info, eq_i, ineq_i, eq_j, ineq_j);
    }
    if count_j == 1 && !cut_j {
        return is_adj_ineq_extension(j, i, info, eq_j, ineq_j, eq_i, ineq_i);
    }
    Ok(Change::None)
}

// Inequality k of i is adjacent to an equality of j, the rest of i valid
// for j. If the facet of the relaxed k is contained in j, relaxing k by one
// extends i by exactly j: commit the relaxation and drop j.
fn is_adj_eq_extension(
    i: usize,
    j: usize,
    k: usize,
    info: &mut [Info],
    ineq_j: &[Status],
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_eq = live_i.bmap.n_eq();
    if live_i.tab.is_equality(n_eq + k) {
        return Ok(Change::None);
    }

    let snap = live_i.tab.snap();
    live_i.tab.relax(n_eq + k)?;
    let snap2 = live_i.tab.snap();
    live_i.tab.select_facet(n_eq + k)?;

    if contains(&live_j.bmap, ineq_j, &live_i.tab)? {
        live_i.tab.rollback(snap2)?;
        live_i.bmap.relax_ineq(k);
        live_i.bmap.mark_final();
        info[j].drop_entry();
        tracing::trace!(i, j, "extended across an adjacent equality");
        if j < i {
            info.swap(i, j);
        }
        Ok(Change::Fuse)
    } else {
        live_i.tab.rollback(snap)?;
        Ok(Change::None)
    }
}

// Inequality k of i is adjacent to basic set j. Wrap both the facet of k
// and the constraints of j around their ridges to enclose the other side
// and fuse with the wrapping rows. The rows wrapped around the facet are
// only valid for the facet by construction and get verified against the
// full basic map.
#[allow(clippy::too_many_arguments)]
fn can_wrap_in_facet(
    i: usize,
    j: usize,
    k: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_col = 1 + live_i.bmap.total_dim();
    let set_i = [set_from_updated(live_i)];
    let set_j = [set_from_updated(live_j)];
    let mut wraps = Wraps::new(n_col, options, live_i, eq_i, ineq_i, live_j, eq_j, ineq_j);

    let mut bound = live_i.bmap.ineq(k).to_vec();
    bound[0] += 1;
    wraps.push(bound.clone());
    wraps.add_wraps(live_j, &bound, &set_i)?;
    if wraps.n_row() == 0 {
        return Ok(Change::None);
    }

    let snap = live_i.tab.snap();
    live_i.tab.select_facet(live_i.bmap.n_eq() + k)?;
    live_i.tab.detect_redundant()?;

    let bound = seq::neg(live_i.bmap.ineq(k));
    let first_facet_row = wraps.n_row();
    wraps.add_wraps(live_i, &bound, &set_j)?;

    live_i.tab.rollback(snap)?;
    wraps.check_wraps(first_facet_row, &live_i.tab)?;
    if wraps.n_row() == 0 {
        return Ok(Change::None);
    }

    fuse(i, j, info, Some(eq_i), ineq_i, Some(eq_j), ineq_j, Some(wraps.mat()), false)
}

// j sticks out of i at the listed cut constraints, each time by at most
// one. For every cut t >= 0, wrap the part of j lying on t = -1 around the
// union; an empty slice means the cut was already valid for the integer
// points and is kept as is.
#[allow(clippy::too_many_arguments)]
fn wrap_in_facets(
    i: usize,
    j: usize,
    cuts: &[usize],
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_col = 1 + live_i.bmap.total_dim();
    let set = [set_from_updated(live_i), set_from_updated(live_j)];
    let mut wraps = Wraps::new(n_col, options, live_i, eq_i, ineq_i, live_j, eq_j, ineq_j);

    let snap = live_j.tab.snap();
    for &cut in cuts {
        let mut relaxed = live_i.bmap.ineq(cut).to_vec();
        relaxed[0] += 1;
        live_j.tab.add_eq(&relaxed)?;
        live_j.tab.detect_redundant()?;

        if live_j.tab.is_empty() {
            // nothing of j lies at distance one, the original cut holds
            relaxed[0] -= 1;
            wraps.push(relaxed);
        } else {
            wraps.push(relaxed.clone());
            wraps.add_wraps(live_j, &relaxed, &set)?;
        }

        live_j.tab.rollback(snap)?;
        if wraps.n_row() == 0 {
            return Ok(Change::None);
        }
    }

    fuse(i, j, info, Some(eq_i), ineq_i, Some(eq_j), ineq_j, Some(wraps.mat()), false)
}

// If j sticks out of every cut inequality of i by at most one, wrap the
// sticking-out slices in. Only the points of j at distance exactly one are
// considered, sound for integer maps only.
#[allow(clippy::too_many_arguments)]
fn can_wrap_in_set(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair(info, i, j);
    if live_i.bmap.is_rational() || live_j.bmap.is_rational() {
        return Ok(Change::None);
    }
    let n = count(ineq_i, Status::Cut);
    if n == 0 {
        return Ok(Change::None);
    }

    let mut cuts = Vec::with_capacity(n);
    for (k, ineq) in live_i.bmap.ineqs().enumerate() {
        if ineq_i[k] != Status::Cut {
            continue;
        }
        let mut relaxed = ineq.to_vec();
        relaxed[0] += 1;
        if live_j.tab.ineq_type(&relaxed)? != IneqType::Redundant {
            break;
        }
        cuts.push(k);
    }
    if cuts.len() < n {
        return Ok(Change::None);
    }

    wrap_in_facets(i, j, &cuts, info, eq_i, ineq_i, eq_j, ineq_j, options)
}

// Try wrapping in each direction; a side with a cut equality cannot be the
// wrapping side.
#[allow(clippy::too_many_arguments)]
fn check_wrap(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    if !any(eq_i, Status::Cut) {
        let change = can_wrap_in_set(i, j, info, eq_i, ineq_i, eq_j, ineq_j, options)?;
        if change != Change::None {
            return Ok(change);
        }
    }
    if !any(eq_j, Status::Cut) {
        return can_wrap_in_set(j, i, info, eq_j, ineq_j, eq_i, ineq_i, options);
    }
    Ok(Change::None)
}

// One side has an equality adjacent to an inequality of the other. With j
// holding the equality and i free of cuts and extra adjacencies, try the
// plain relaxation extension first, then the facet wrapping.
#[allow(clippy::too_many_arguments)]
fn check_adj_eq(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    if any(eq_i, Status::AdjIneq) && any(eq_j, Status::AdjIneq) {
        // adjacent equalities on both sides: too many to handle
        return Ok(Change::None);
    }
    if any(eq_i, Status::AdjIneq) {
        return check_adj_eq(j, i, info, eq_j, ineq_j, eq_i, ineq_i, options);
    }

    // j has an equality adjacent to an inequality of i
    if any(eq_i, Status::Cut) || any(ineq_i, Status::Cut) {
        return Ok(Change::None);
    }
    if count(ineq_i, Status::AdjEq) != 1
        || any(ineq_j, Status::AdjEq)
        || any(ineq_i, Status::AdjIneq)
        || any(ineq_j, Status::AdjIneq)
    {
        return Ok(Change::None);
    }
    let k = ineq_i
        .iter()
        .position(|&s| s == Status::AdjEq)
        .ok_or(Error::Internal("expected an inequality adjacent to an equality"))?;

    let change = is_adj_eq_extension(i, j, k, info, ineq_j)?;
    if change != Change::None {
        return Ok(change);
    }

    if count(eq_j, Status::AdjIneq) != 1 {
        return Ok(Change::None);
    }
    can_wrap_in_facet(i, j, k, info, eq_i, ineq_i, eq_j, ineq_j, options)
}

// The two basic maps lie on adjacent parallel hyperplanes. Wrap the
// constraints of each side around the one-step slab between them and fuse.
// With more than one adjacent equality the result satisfies equalities that
// arrive encoded as opposite wrapping rows, so the fusion re-detects them.
#[allow(clippy::too_many_arguments)]
fn check_eq_adj_eq(
    i: usize,
    j: usize,
    info: &mut [Info],
    eq_i: &[Status],
    ineq_i: &[Status],
    eq_j: &[Status],
    ineq_j: &[Status],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair_mut(info, i, j);
    let n_col = 1 + live_i.bmap.total_dim();
    let detect_equalities = count(eq_i, Status::AdjEq) != 1;
    let k = eq_i
        .iter()
        .position(|&s| s == Status::AdjEq)
        .ok_or(Error::Internal("expected an adjacent equality"))?;

    let set_i = [set_from_updated(live_i)];
    let set_j = [set_from_updated(live_j)];
    let mut wraps = Wraps::new(n_col, options, live_i, eq_i, ineq_i, live_j, eq_j, ineq_j);

    // the direction of equality k / 2 whose status slot was adjacent
    let mut bound = if k % 2 == 0 {
        seq::neg(live_i.bmap.eq(k / 2))
    } else {
        live_i.bmap.eq(k / 2).to_vec()
    };
    bound[0] += 1;
    wraps.push(bound.clone());
    wraps.add_wraps(live_j, &bound, &set_i)?;
    if wraps.n_row() == 0 {
        return Ok(Change::None);
    }

    bound[0] -= 1;
    let bound = seq::neg(&bound);
    wraps.push(bound.clone());
    wraps.add_wraps(live_i, &bound, &set_j)?;
    if wraps.n_row() == 0 {
        return Ok(Change::None);
    }

    fuse(
        i,
        j,
        info,
        Some(eq_i),
        ineq_i,
        Some(eq_j),
        ineq_j,
        Some(wraps.mat()),
        detect_equalities,
    )
}

// The pair lives in the same local space. Classify every constraint of each
// side against the other (a single separate constraint settles it), then
// try in order: subsumption, adjacent equalities, an equality adjacent to
// an inequality, adjacent inequality pairs, the all-cut facet check, and
// wrapping.
fn coalesce_local_pair(
    i: usize,
    j: usize,
    info: &mut [Info],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair(info, i, j);

    let eq_i = eq_status_in(&live_i.bmap, &live_j.tab)?;
    if any(&eq_i, Status::Separate) {
        return Ok(Change::None);
    }
    let eq_j = eq_status_in(&live_j.bmap, &live_i.tab)?;
    if any(&eq_j, Status::Separate) {
        return Ok(Change::None);
    }
    let ineq_i = ineq_status_in(&live_i.bmap, Some(&live_i.tab), &live_j.tab)?;
    if any(&ineq_i, Status::Separate) {
        return Ok(Change::None);
    }
    let ineq_j = ineq_status_in(&live_j.bmap, Some(&live_j.tab), &live_i.tab)?;
    if any(&ineq_j, Status::Separate) {
        return Ok(Change::None);
    }

    if all(&eq_i, Status::Valid) && all(&ineq_i, Status::Valid) {
        info[j].drop_entry();
        tracing::trace!(i, j, "second contained in first");
        Ok(Change::DropSecond)
    } else if all(&eq_j, Status::Valid) && all(&ineq_j, Status::Valid) {
        info[i].drop_entry();
        tracing::trace!(i, j, "first contained in second");
        Ok(Change::DropFirst)
    } else if any(&eq_i, Status::AdjEq) {
        check_eq_adj_eq(i, j, info, &eq_i, &ineq_i, &eq_j, &ineq_j, options)
    } else if any(&eq_j, Status::AdjEq) {
        check_eq_adj_eq(j, i, info, &eq_j, &ineq_j, &eq_i, &ineq_i, options)
    } else if any(&eq_i, Status::AdjIneq) || any(&eq_j, Status::AdjIneq) {
        check_adj_eq(i, j, info, &eq_i, &ineq_i, &eq_j, &ineq_j, options)
    } else if any(&ineq_i, Status::AdjEq) || any(&ineq_j, Status::AdjEq) {
        // an inequality adjacent to an equality implies the equality side
        // carried an adjacent slot, which the arms above already handled
        Ok(Change::None)
    } else if any(&ineq_i, Status::AdjIneq) || any(&ineq_j, Status::AdjIneq) {
        check_adj_ineq(i, j, info, &eq_i, &ineq_i, &eq_j, &ineq_j)
    } else {
        let mut change = Change::None;
        if !any(&eq_i, Status::Cut) && !any(&eq_j, Status::Cut) {
            change = check_facets(i, j, info, &ineq_i, &ineq_j)?;
        }
        if change == Change::None {
            change = check_wrap(i, j, info, &eq_i, &ineq_i, &eq_j, &ineq_j, options)?;
        }
        Ok(change)
    }
}

fn contains_with_expanded_divs(
    bmap: &BasicMap,
    tab: &Tab,
    divs: &[Vec<BigInt>],
    exp: &[usize],
) -> Result<bool, Error> {
    let expanded = bmap.expand_divs(divs, exp);
    let eq_st = eq_status_in(&expanded, tab)?;
    if any(&eq_st, Status::Separate) {
        return Ok(false);
    }
    let ineq_st = ineq_status_in(&expanded, None, tab)?;
    if any(&ineq_st, Status::Separate) {
        return Ok(false);
    }
    Ok(all(&eq_st, Status::Valid) && all(&ineq_st, Status::Valid))
}

fn contains_after_aligning_divs(bmap_i: &BasicMap, live_j: &Live) -> Result<bool, Error> {
    if !bmap_i.divs_known() {
        return Ok(false);
    }
    let Some(exp) = div::align_divs(bmap_i, &live_j.bmap) else {
        return Ok(false);
    };
    let divs: Vec<Vec<BigInt>> = live_j.bmap.divs().map(|d| d.to_vec()).collect();
    contains_with_expanded_divs(bmap_i, &live_j.tab, &divs, &exp)
}

// If basic map i has fewer divs than j and contains it, drop j.
fn coalesced_subset(i: usize, j: usize, info: &mut [Info]) -> Result<bool, Error> {
    let (live_i, live_j) = live_pair(info, i, j);
    if live_i.bmap.n_div() >= live_j.bmap.n_div() {
        return Ok(false);
    }
    let superset = contains_after_aligning_divs(&live_i.bmap, live_j)?;
    if superset {
        info[j].drop_entry();
        tracing::trace!(i, j, "subset dropped across div spaces");
    }
    Ok(superset)
}

// The pair does not share a local space; only subset relations are
// attempted, from the side with fewer divs.
fn check_coalesce_subset(i: usize, j: usize, info: &mut [Info]) -> Result<Change, Error> {
    if coalesced_subset(i, j, info)? {
        return Ok(Change::DropSecond);
    }
    if coalesced_subset(j, i, info)? {
        return Ok(Change::DropFirst);
    }
    Ok(Change::None)
}

pub(crate) fn coalesce_pair(
    i: usize,
    j: usize,
    info: &mut [Info],
    options: &Options,
) -> Result<Change, Error> {
    let (live_i, live_j) = live_pair(info, i, j);
    if div::same_divs(&live_i.bmap, &live_j.bmap) {
        coalesce_local_pair(i, j, info, options)
    } else {
        check_coalesce_subset(i, j, info)
    }
}
