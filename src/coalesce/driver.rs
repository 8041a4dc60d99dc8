use crate::coalesce::pair::{Change, coalesce_pair};
use crate::error::Error;
use crate::map::basic::BasicMap;
use crate::map::map::Map;
use crate::tab::tableau::Tab;

/// Tunables for the coalescing driver.
#[derive(Debug, Clone)]
pub struct Options {
    /// Reject wrapping constraints with coefficients above those of the
    /// constraints they replace.
    pub bounded_wrapping: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { bounded_wrapping: true }
    }
}

/// One live entry of the coalescing state: a basic map and its tableau.
pub(crate) struct Live {
    pub bmap: BasicMap,
    pub tab: Tab,
}

/// Per-basic-map bookkeeping of the driver. A removed entry has given up
/// its basic map and tableau for good.
pub(crate) struct Info {
    live: Option<Live>,
}

impl Info {
    fn new(bmap: BasicMap, tab: Tab) -> Info {
        Info { live: Some(Live { bmap, tab }) }
    }

    pub fn is_removed(&self) -> bool {
        self.live.is_none()
    }

    /// # Panics
    ///
    /// Panics if the entry has been removed; removed entries never reach
    /// the classification and fusion paths.
    pub fn live(&self) -> &Live {
        self.live.as_ref().expect("entry has been removed")
    }

    pub fn live_mut(&mut self) -> &mut Live {
        self.live.as_mut().expect("entry has been removed")
    }

    pub fn drop_entry(&mut self) {
        self.live = None;
    }

    pub fn replace(&mut self, bmap: BasicMap, tab: Tab) {
        self.live = Some(Live { bmap, tab });
    }
}

pub(crate) fn live_pair<'a>(info: &'a [Info], i: usize, j: usize) -> (&'a Live, &'a Live) {
    (info[i].live(), info[j].live())
}

pub(crate) fn live_pair_mut<'a>(
    info: &'a mut [Info],
    i: usize,
    j: usize,
) -> (&'a mut Live, &'a mut Live) {
    assert!(i != j);
    if i < j {
        let (head, tail) = info.split_at_mut(j);
        (head[i].live_mut(), tail[0].live_mut())
    } else {
        let (head, tail) = info.split_at_mut(i);
        (tail[0].live_mut(), head[j].live_mut())
    }
}

// Pairwise coalesce the entries, skipping removed ones. A dropped i ends
// the inner loop, a dropped j continues it, and after a fusion the survivor
// at i is rechecked against every later entry. Each fusion removes an
// entry, so the iteration terminates.
fn coalesce_infos(info: &mut [Info], options: &Options) -> Result<(), Error> {
    let n = info.len();
    for i in (0..n.saturating_sub(1)).rev() {
        if info[i].is_removed() {
            continue;
        }
        let mut j = i + 1;
        while j < n {
            if info[j].is_removed() {
                j += 1;
                continue;
            }
            debug_assert!(!info[i].is_removed());
            let change = coalesce_pair(i, j, info, options)?;
            tracing::trace!(i, j, ?change, "coalesce attempt");
            match change {
                Change::None | Change::DropSecond => j += 1,
                Change::DropFirst => break,
                Change::Fuse => j = i + 1,
            }
        }
    }
    Ok(())
}

// The tableaux built along the way also detect implicit equalities and
// redundant constraints up front; detected equalities are made explicit
// immediately, the final Gauss pass runs when the survivors are written
// back.
pub(crate) fn coalesce_map(mut map: Map, options: &Options) -> Result<Map, Error> {
    map.remove_empty_parts();
    if map.n_basic_maps() <= 1 {
        return Ok(map);
    }
    map.sort_all_divs();

    let mut info = Vec::with_capacity(map.n_basic_maps());
    for bmap in map.basic_maps() {
        let mut bmap = bmap.clone();
        let mut tab = Tab::from_basic_map(&bmap)?;
        if !bmap.no_implicit() && !tab.is_empty() {
            tab.detect_implicit_equalities()?;
            if tab.any_implicit_equality(bmap.n_eq()) {
                bmap = bmap.updated_from_tab(&tab);
                tab = Tab::from_basic_map(&bmap)?;
            }
        }
        if !bmap.no_redundant() {
            tab.detect_redundant()?;
        }
        info.push(Info::new(bmap, tab));
    }
    for entry in info.iter_mut() {
        if !entry.is_removed() && entry.live().tab.is_empty() {
            entry.drop_entry();
        }
    }

    coalesce_infos(&mut info, options)?;

    let bmaps = map.basic_maps_mut();
    for i in (0..info.len()).rev() {
        if info[i].is_removed() {
            bmaps.swap_remove(i);
            continue;
        }
        let live = info[i].live();
        let mut updated = live.bmap.updated_from_tab(&live.tab);
        updated.gauss();
        updated.finalize();
        updated.set_no_implicit();
        updated.set_no_redundant();
        bmaps[i] = updated;
    }
    tracing::debug!(n = map.n_basic_maps(), "coalesce finished");
    Ok(map)
}
