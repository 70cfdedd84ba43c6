//! Safe-zone analysis: how far a change can ripple before it leaves a
//! self-contained neighbourhood.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::CodeGraph;
use crate::types::SymbolId;

/// Hop limit used when none is given.
pub const DEFAULT_DEPTH: usize = 5;

/// Boundary sizes up to this count as contained.
pub const CONTAINED_MAX_BOUNDARY: usize = 5;

/// Classification of a neighbourhood by its boundary size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeZone {
    /// Nothing inside touches anything outside
    Isolated,
    /// A handful of boundary symbols
    Contained,
    /// Many boundary symbols
    Exposed,
}

impl SafeZone {
    fn from_boundary(size: usize) -> Self {
        match size {
            0 => Self::Isolated,
            s if s <= CONTAINED_MAX_BOUNDARY => Self::Contained,
            _ => Self::Exposed,
        }
    }
}

impl fmt::Display for SafeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Isolated => "isolated",
            Self::Contained => "contained",
            Self::Exposed => "exposed",
        })
    }
}

/// Result of a bounded neighbourhood walk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeZoneReport {
    /// Where the walk started
    pub seeds: Vec<SymbolId>,
    /// Hop limit used
    pub depth: usize,
    /// Reached symbols with no neighbour outside the zone
    pub internal_ids: Vec<SymbolId>,
    /// Reached symbols with at least one neighbour outside the zone
    pub boundary_ids: Vec<SymbolId>,
    /// External callers plus callees of each boundary symbol
    pub external_ref_counts: BTreeMap<SymbolId, usize>,
    /// Classification by boundary size
    pub zone: SafeZone,
}

/// Walk callers and callees from `seeds` for at most `depth` hops and split
/// the reached set into internal and boundary symbols.
///
/// # Errors
///
/// `Error::NotFound` if no seed is in the graph.
pub fn safe_zones(graph: &CodeGraph, seeds: &[SymbolId], depth: usize) -> Result<SafeZoneReport> {
    let adj = graph.adjacency();
    let starts: Vec<usize> = seeds.iter().filter_map(|&id| adj.index_of(id)).collect();
    if starts.is_empty() {
        return Err(Error::NotFound("no seed symbol is in the graph".to_string()));
    }

    let mut hops: HashMap<usize, usize> = starts.iter().map(|&s| (s, 0)).collect();
    let mut queue: VecDeque<usize> = starts.iter().copied().collect();
    while let Some(u) = queue.pop_front() {
        let d = hops[&u];
        if d >= depth {
            continue;
        }
        for &v in adj.neighbors(u) {
            if !hops.contains_key(&v) {
                hops.insert(v, d + 1);
                queue.push_back(v);
            }
        }
    }

    let mut internal = BTreeSet::new();
    let mut boundary = BTreeSet::new();
    let mut external_ref_counts = BTreeMap::new();
    for &u in hops.keys() {
        let outside = |list: &[usize]| list.iter().filter(|&&v| !hops.contains_key(&v)).count();
        let external = outside(adj.out(u)) + outside(adj.inc(u));
        let id = adj.id(u);
        if external == 0 {
            internal.insert(id);
        } else {
            boundary.insert(id);
            external_ref_counts.insert(id, external);
        }
    }

    let mut seeds: Vec<SymbolId> = starts.iter().map(|&s| adj.id(s)).collect();
    seeds.sort_unstable();
    seeds.dedup();
    Ok(SafeZoneReport {
        seeds,
        depth,
        zone: SafeZone::from_boundary(boundary.len()),
        internal_ids: internal.into_iter().collect(),
        boundary_ids: boundary.into_iter().collect(),
        external_ref_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::graph;
    use rstest::rstest;

    ///   1 -> 2 -> 3 -> 4 -> 5        6 <-> 7
    fn line() -> CodeGraph {
        graph(&[1, 2, 3, 4, 5, 6, 7], &[(1, 2), (2, 3), (3, 4), (4, 5), (6, 7), (7, 6)])
    }

    #[test]
    fn disconnected_island_is_isolated() {
        let report = safe_zones(&line(), &[SymbolId(6)], DEFAULT_DEPTH).unwrap();

        assert_eq!(report.zone, SafeZone::Isolated);
        assert_eq!(report.internal_ids, vec![SymbolId(6), SymbolId(7)]);
        assert!(report.boundary_ids.is_empty());
    }

    #[test]
    fn hop_limit_creates_a_boundary() {
        let report = safe_zones(&line(), &[SymbolId(3)], 1).unwrap();

        assert_eq!(report.internal_ids, vec![SymbolId(3)]);
        assert_eq!(report.boundary_ids, vec![SymbolId(2), SymbolId(4)]);
        assert_eq!(report.external_ref_counts[&SymbolId(2)], 1);
        assert_eq!(report.zone, SafeZone::Contained);
    }

    #[rstest]
    #[case(0, SafeZone::Isolated)]
    #[case(5, SafeZone::Contained)]
    #[case(6, SafeZone::Exposed)]
    fn classification_by_boundary_size(#[case] size: usize, #[case] expected: SafeZone) {
        assert_eq!(SafeZone::from_boundary(size), expected);
    }

    #[test]
    fn unknown_seeds_are_not_found() {
        assert!(matches!(
            safe_zones(&line(), &[SymbolId(42)], 3),
            Err(Error::NotFound(_))
        ));
    }
}
