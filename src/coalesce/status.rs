use num_bigint::BigInt;

use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::tab::tableau::{IneqType, Tab};
use crate::utils::seq;

// Position of one constraint relative to another basic map. Redundant is
// only assigned from the constraint's own tableau and is skipped by every
// scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Redundant,
    Valid,
    Separate,
    Cut,
    AdjEq,
    AdjIneq,
}

impl From<IneqType> for Status {
    fn from(ty: IneqType) -> Status {
        match ty {
            IneqType::Redundant => Status::Valid,
            IneqType::Separate => Status::Separate,
            IneqType::Cut => Status::Cut,
            IneqType::AdjEq => Status::AdjEq,
            IneqType::AdjIneq => Status::AdjIneq,
        }
    }
}

pub(crate) fn status_in(row: &[BigInt], tab: &Tab) -> Result<Status, Error> {
    Ok(tab.ineq_type(row)?.into())
}

// Two slots per equality: slot 2k is the negated direction, slot 2k + 1 the
// equality itself. The scan stops once a direction comes back separate, so
// the caller must test for separate before reading the array as a whole.
pub(crate) fn eq_status_in(bmap_i: &BasicMap, tab_j: &Tab) -> Result<Vec<Status>, Error> {
    let mut statuses = Vec::with_capacity(2 * bmap_i.n_eq());
    for eq in bmap_i.eqs() {
        let neg = seq::neg(eq);
        let lo = status_in(&neg, tab_j)?;
        let hi = status_in(eq, tab_j)?;
        statuses.push(lo);
        statuses.push(hi);
        if lo == Status::Separate || hi == Status::Separate {
            break;
        }
    }
    Ok(statuses)
}

// An inequality tab_i already knows to be redundant stays redundant without
// consulting tab_j, or a later relaxation could be blocked by it.
pub(crate) fn ineq_status_in(
    bmap_i: &BasicMap,
    tab_i: Option<&Tab>,
    tab_j: &Tab,
) -> Result<Vec<Status>, Error> {
    let n_eq = bmap_i.n_eq();
    let mut statuses = Vec::with_capacity(bmap_i.n_ineq());
    for (k, ineq) in bmap_i.ineqs().enumerate() {
        if tab_i.is_some_and(|tab| tab.is_redundant(n_eq + k)) {
            statuses.push(Status::Redundant);
            continue;
        }
        let status = status_in(ineq, tab_j)?;
        statuses.push(status);
        if status == Status::Separate {
            break;
        }
    }
    Ok(statuses)
}

pub(crate) fn any(statuses: &[Status], status: Status) -> bool {
    statuses.iter().any(|&s| s == status)
}

pub(crate) fn count(statuses: &[Status], status: Status) -> usize {
    statuses.iter().filter(|&&s| s == status).count()
}

// Redundant slots are skipped.
pub(crate) fn all(statuses: &[Status], status: Status) -> bool {
    statuses.iter().all(|&s| s == Status::Redundant || s == status)
}

// Does bmap contain the basic map represented by tab? An empty tableau is
// contained in anything.
pub(crate) fn contains(
    bmap: &BasicMap,
    ineq_statuses: &[Status],
    tab: &Tab,
) -> Result<bool, Error> {
    if tab.is_empty() {
        return Ok(true);
    }
    for eq in bmap.eqs() {
        let neg = seq::neg(eq);
        if status_in(&neg, tab)? != Status::Valid {
            return Ok(false);
        }
        if status_in(eq, tab)? != Status::Valid {
            return Ok(false);
        }
    }
    for (k, ineq) in bmap.ineqs().enumerate() {
        if ineq_statuses[k] == Status::Redundant {
            continue;
        }
        if status_in(ineq, tab)? != Status::Valid {
            return Ok(false);
        }
    }
    Ok(true)
}
