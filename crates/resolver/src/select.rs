//! Candidate selection policy.

use crate::provider::SearchCandidate;

/// Pick the winner from one provider's candidate list.
///
/// Tie-break order, fixed regardless of which provider produced the list:
/// exact case-insensitive name match with the queried variant, then the
/// first candidate carrying a cover reference, then the first candidate of
/// any kind. Empty list → `None`.
pub fn select<'a>(query: &str, candidates: &'a [SearchCandidate]) -> Option<&'a SearchCandidate> {
    let query_lower = query.to_lowercase();
    if let Some(exact) = candidates
        .iter()
        .find(|c| c.name.to_lowercase() == query_lower)
    {
        return Some(exact);
    }
    if let Some(with_cover) = candidates.iter().find(|c| c.cover_url.is_some()) {
        return Some(with_cover);
    }
    candidates.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, cover: Option<&str>) -> SearchCandidate {
        SearchCandidate {
            name: name.to_string(),
            cover_url: cover.map(|c| c.to_string()),
            metadata: None,
        }
    }

    #[test]
    fn exact_name_beats_cover_presence() {
        let candidates = vec![
            candidate("The Witcher 3: Wild Hunt", None),
            candidate("The Witcher 3: Wild Hunt - Complete Edition", Some("https://img/1.jpg")),
        ];
        let winner = select("the witcher 3: wild hunt", &candidates).unwrap();
        assert_eq!(winner.name, "The Witcher 3: Wild Hunt");
        assert!(winner.cover_url.is_none());
    }

    #[test]
    fn cover_presence_breaks_non_exact_ties() {
        let candidates = vec![
            candidate("Witcher Adventures", None),
            candidate("The Witcher: Enhanced", Some("https://img/2.jpg")),
        ];
        let winner = select("Witcher", &candidates).unwrap();
        assert_eq!(winner.name, "The Witcher: Enhanced");
    }

    #[test]
    fn falls_back_to_first_candidate() {
        let candidates = vec![candidate("A", None), candidate("B", None)];
        assert_eq!(select("Z", &candidates).unwrap().name, "A");
    }

    #[test]
    fn empty_list_selects_nothing() {
        assert!(select("anything", &[]).is_none());
    }

    #[test]
    fn selection_is_deterministic() {
        let candidates = vec![
            candidate("Alpha", Some("https://img/a.jpg")),
            candidate("Beta", Some("https://img/b.jpg")),
        ];
        let first = select("Gamma", &candidates).map(|c| c.name.clone());
        for _ in 0..10 {
            assert_eq!(select("Gamma", &candidates).map(|c| c.name.clone()), first);
        }
    }
}
