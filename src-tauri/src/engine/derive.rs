//! Search, filter and sort over the live result set.
//!
//! Pure and deterministic. The display list is always recomputed from the
//! store and the current [`DerivationState`], never cached.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::types::{DerivationState, Profile, SortOrder};

pub fn derive<'a>(traitors: &'a [Profile], state: &DerivationState) -> Vec<&'a Profile> {
    let query = state.search_query.to_lowercase();
    let mut seen: HashSet<&str> = HashSet::new();

    let mut out: Vec<&Profile> = traitors
        .iter()
        .filter(|p| matches_query(p, &query))
        .filter(|p| state.filter.matches(p))
        .filter(|p| seen.insert(p.id.as_str()))
        .collect();

    match state.sort_order {
        SortOrder::Default => {}
        SortOrder::AlphaAsc => out.sort_by(|a, b| collate(&a.username, &b.username)),
        SortOrder::AlphaDesc => out.sort_by(|a, b| collate(&b.username, &a.username)),
    }
    out
}

/// Case-insensitive substring match on username or full name.
fn matches_query(profile: &Profile, query: &str) -> bool {
    query.is_empty()
        || profile.username.to_lowercase().contains(query)
        || profile.full_name.to_lowercase().contains(query)
}

/// Locale-style ordering: letters compare case-insensitively first, the raw
/// strings break ties so the order stays total.
pub fn collate(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{profile, Filter};

    fn names(list: &[&Profile]) -> Vec<String> {
        list.iter().map(|p| p.username.clone()).collect()
    }

    fn state(filter: Filter, sort_order: SortOrder, query: &str) -> DerivationState {
        DerivationState {
            filter,
            sort_order,
            search_query: query.to_string(),
        }
    }

    #[test]
    fn test_search_keeps_store_order() {
        let traitors = vec![profile("1", "ghost99"), profile("2", "shadow"), profile("3", "ghoul")];
        let out = derive(&traitors, &state(Filter::All, SortOrder::Default, "gh"));
        assert_eq!(names(&out), vec!["ghost99", "ghoul"]);
    }

    #[test]
    fn test_alpha_desc() {
        let traitors = vec![profile("1", "alice"), profile("2", "bob"), profile("3", "carol")];
        let out = derive(&traitors, &state(Filter::All, SortOrder::AlphaDesc, ""));
        assert_eq!(names(&out), vec!["carol", "bob", "alice"]);
    }

    #[test]
    fn test_alpha_asc_ignores_case() {
        let traitors = vec![profile("1", "Zoe"), profile("2", "adam"), profile("3", "Bea")];
        let out = derive(&traitors, &state(Filter::All, SortOrder::AlphaAsc, ""));
        assert_eq!(names(&out), vec!["adam", "Bea", "Zoe"]);
    }

    #[test]
    fn test_search_matches_full_name_case_insensitively() {
        let mut p = profile("1", "xx_1");
        p.full_name = "Maria GHOSH".to_string();
        let traitors = vec![p, profile("2", "yy")];
        let out = derive(&traitors, &state(Filter::All, SortOrder::Default, "Gho"));
        assert_eq!(names(&out), vec!["xx_1"]);
    }

    #[test]
    fn test_filter_applies_after_search() {
        let mut private = profile("1", "ghost_private");
        private.is_private = true;
        let mut brand = profile("2", "ghost_brand");
        brand.is_business_account = true;
        brand.is_private = true;
        let traitors = vec![private, brand, profile("3", "ghost_me"), profile("4", "other")];

        let only_private = derive(&traitors, &state(Filter::Private, SortOrder::Default, "ghost"));
        assert_eq!(names(&only_private), vec!["ghost_private"]);

        let business = derive(&traitors, &state(Filter::Business, SortOrder::Default, ""));
        assert_eq!(names(&business), vec!["ghost_brand"]);

        let personal = derive(&traitors, &state(Filter::Personal, SortOrder::AlphaDesc, ""));
        assert_eq!(names(&personal), vec!["other", "ghost_me"]);
    }

    #[test]
    fn test_derivation_is_repeatable_and_bounded() {
        let traitors = vec![
            profile("1", "b"),
            profile("2", "a"),
            profile("2", "a"),
            profile("3", "c"),
        ];
        let s = state(Filter::All, SortOrder::AlphaAsc, "");
        let first = derive(&traitors, &s);
        let second = derive(&traitors, &s);
        assert_eq!(first, second);
        assert!(first.len() <= traitors.len());
        assert_eq!(names(&first), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_match_is_empty() {
        let traitors = vec![profile("1", "alice")];
        assert!(derive(&traitors, &state(Filter::All, SortOrder::Default, "zzz")).is_empty());
    }
}
