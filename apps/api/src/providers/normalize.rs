use chrono::Utc;

use super::{CanonicalJobPosting, RawPosting};

const SNIPPET_MAX_CHARS: usize = 200;
const NOT_SPECIFIED: &str = "Not specified";

/// Maps a provider's raw posting into the canonical shape.
///
/// Field fallbacks: description and snippet are derived from each other when
/// one is missing (the snippet capped at 200 chars), salary and experience
/// degrade to "Not specified", a missing external id falls back to a
/// millisecond timestamp so the posting still has a cache identity, and a
/// missing posted date falls back to now. Empty strings count as missing.
pub fn normalize(raw: RawPosting, source: &str) -> CanonicalJobPosting {
    let description = non_empty(raw.description);
    let snippet = non_empty(raw.snippet);

    CanonicalJobPosting {
        external_id: non_empty(raw.external_id)
            .unwrap_or_else(|| Utc::now().timestamp_millis().to_string()),
        source: source.to_string(),
        title: raw.title.unwrap_or_default(),
        company: raw.company.unwrap_or_default(),
        location: raw.location.unwrap_or_default(),
        description: description.clone().or_else(|| snippet.clone()).unwrap_or_default(),
        snippet: snippet
            .or_else(|| description.map(|d| d.chars().take(SNIPPET_MAX_CHARS).collect()))
            .unwrap_or_default(),
        salary: non_empty(raw.salary).unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        experience_required: non_empty(raw.experience)
            .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        link: raw.link.unwrap_or_default(),
        posted_date: raw.posted_date.unwrap_or_else(Utc::now),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}
