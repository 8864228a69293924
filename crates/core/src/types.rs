use serde::{Deserialize, Serialize};

/// Catalog family a recorded title belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Game,
    Film,
    Series,
    Book,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Film => "film",
            Self::Series => "series",
            Self::Book => "book",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra knowledge the caller has about one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleHints {
    pub year: Option<i32>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

/// One title submitted for resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRequest {
    /// The title exactly as recorded locally.
    pub title: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub hints: TitleHints,
    /// Skip the cache-hit fast path and re-resolve, overwriting any
    /// previous outcome (including an absent-marker).
    #[serde(default)]
    pub force: bool,
}

impl TitleRequest {
    pub fn new(title: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            title: title.into(),
            kind,
            hints: TitleHints::default(),
            force: false,
        }
    }

    pub fn with_hints(mut self, hints: TitleHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Descriptive fields a catalog may report for a matched entry.
///
/// Which fields are populated depends on the catalog: games carry rating on
/// a 0–100 scale, films/series on 0–10, books usually only authors and a
/// publication year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub summary: Option<String>,
    pub genres: Option<Vec<String>>,
    pub runtime_minutes: Option<i32>,
    pub seasons: Option<i32>,
    pub episodes: Option<i32>,
    pub authors: Option<Vec<String>>,
}

/// The externally visible outcome for one resolved title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMedia {
    pub cover_url: Option<String>,
    pub metadata: Option<MediaMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_display_matches_serde_form() {
        for kind in [
            MediaKind::Game,
            MediaKind::Film,
            MediaKind::Series,
            MediaKind::Book,
        ] {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn request_defaults_are_empty() {
        let req = TitleRequest::new("Outer Wilds", MediaKind::Game);
        assert_eq!(req.hints, TitleHints::default());
        assert!(!req.force);
    }
}
