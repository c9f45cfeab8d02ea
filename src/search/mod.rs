//! Case-insensitive substring search over the center catalog.

use crate::models::{Center, Program};
use std::collections::HashMap;

/// Lower-cased query. `None` means "no filter".
///
/// Only a blank query disables filtering; surrounding whitespace is otherwise
/// part of the needle.
pub fn normalize_query(query: &str) -> Option<String> {
    if query.trim().is_empty() {
        None
    } else {
        Some(query.to_lowercase())
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Whether `center` matches an already-normalized query on name, city,
/// any amenity, or the name of any of its programs.
pub fn center_matches(center: &Center, needle: &str, programs: &[&Program]) -> bool {
    contains(&center.name, needle)
        || contains(&center.city, needle)
        || center.amenities.iter().any(|a| contains(a, needle))
        || programs.iter().any(|p| contains(&p.name, needle))
}

/// Filter `centers` by `query`, keeping their relative order.
///
/// Programs are joined to centers by `rec_center_id`. An empty or
/// whitespace-only query returns every center.
pub fn filter(query: &str, centers: &[Center], programs: &[Program]) -> Vec<Center> {
    let Some(needle) = normalize_query(query) else {
        return centers.to_vec();
    };

    let mut by_center: HashMap<&str, Vec<&Program>> = HashMap::new();
    for p in programs {
        by_center.entry(p.rec_center_id.as_str()).or_default().push(p);
    }

    centers
        .iter()
        .filter(|c| {
            let owned = by_center.get(c.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            center_matches(c, &needle, owned)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{center, program};

    fn ids(cs: &[Center]) -> Vec<&str> {
        cs.iter().map(|c| c.id.as_str()).collect()
    }

    fn catalog() -> (Vec<Center>, Vec<Program>) {
        let centers = vec![
            center("a", "Oakridge", "Portland", &["Pool"]),
            center("b", "Riverside", "Salem", &["Trails"]),
            center("c", "Maplewood Community Center", "Portland", &["Basketball Court"]),
            center("d", "Pinecrest", "Eugene", &[]),
        ];
        let programs = vec![
            program("p1", "d", "Youth Swimming Lessons"),
            program("p2", "b", "Trail Running Club"),
            program("p3", "zz", "Orphan Pottery"),
        ];
        (centers, programs)
    }

    #[test]
    fn test_pool_scenario_matches_only_oakridge() {
        let centers = vec![
            center("a", "Oakridge", "Portland", &["Pool"]),
            center("b", "Riverside", "Salem", &["Trails"]),
        ];
        assert_eq!(ids(&filter("pool", &centers, &[])), vec!["a"]);
    }

    #[test]
    fn test_empty_and_blank_query_is_identity() {
        let (centers, programs) = catalog();
        assert_eq!(filter("", &centers, &programs), centers);
        assert_eq!(filter("   \t", &centers, &programs), centers);
    }

    #[test]
    fn test_matches_each_field() {
        let (centers, programs) = catalog();
        assert_eq!(ids(&filter("RIVER", &centers, &programs)), vec!["b"]);
        assert_eq!(ids(&filter("portland", &centers, &programs)), vec!["a", "c"]);
        assert_eq!(ids(&filter("basketball", &centers, &programs)), vec!["c"]);
        assert_eq!(ids(&filter("swimming", &centers, &programs)), vec!["d"]);
    }

    #[test]
    fn test_program_join_uses_owning_center_only() {
        let (centers, programs) = catalog();
        assert!(filter("pottery", &centers, &programs).is_empty());
    }

    #[test]
    fn test_query_is_matched_verbatim_not_tokenized() {
        let (centers, programs) = catalog();
        assert_eq!(ids(&filter("oak", &centers, &programs)), vec!["a"]);
        assert!(filter(" pool", &centers, &programs).is_empty());
        assert!(filter("oak ", &centers, &programs).is_empty());
        assert!(filter("oak salem", &centers, &programs).is_empty());
        // Inner whitespace is still a literal match.
        assert_eq!(ids(&filter("community center", &centers, &programs)), vec!["c"]);
    }

    #[test]
    fn test_result_preserves_input_order() {
        let (centers, programs) = catalog();
        // "r" hits Oakridge, Riverside, Maplewood (Center/Court), Pinecrest, in that order.
        let out = filter("r", &centers, &programs);
        assert_eq!(ids(&out), vec!["a", "b", "c", "d"]);

        let reversed: Vec<Center> = centers.iter().rev().cloned().collect();
        assert_eq!(ids(&filter("r", &reversed, &programs)), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_every_result_matches_and_no_match_is_dropped() {
        let (centers, programs) = catalog();
        for q in ["o", "tr", "pool", " pool", "eugene", "club", "xyz", "EN", "d c"] {
            let out = filter(q, &centers, &programs);
            let needle = q.to_lowercase();
            for c in &centers {
                let owned: Vec<&Program> =
                    programs.iter().filter(|p| p.rec_center_id == c.id).collect();
                let expected = center_matches(c, &needle, &owned);
                assert_eq!(out.iter().any(|o| o.id == c.id), expected, "query {q:?}, center {}", c.id);
            }
        }
    }
}
