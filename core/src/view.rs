//! Filtering and ordering of album lists for display.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{Album, CountMode};

pub const MAX_SUGGESTIONS: usize = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortKey {
    Title,
    #[default]
    DateNewest,
    DateOldest,
    Items,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LockFilter {
    #[default]
    All,
    Locked,
    Unlocked,
}

impl LockFilter {
    pub fn admits(&self, album: &Album) -> bool {
        match self {
            LockFilter::All => true,
            LockFilter::Locked => album.is_locked,
            LockFilter::Unlocked => !album.is_locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewQuery {
    pub query: String,
    pub lock_filter: LockFilter,
    pub sort_key: SortKey,
}

impl ViewQuery {
    pub fn apply<'a>(&self, albums: &'a [Album], count_mode: CountMode) -> Vec<&'a Album> {
        derive_view(
            albums,
            &self.query,
            self.lock_filter,
            self.sort_key,
            count_mode,
        )
    }

    /// Whether filter or sort differ from the defaults. The search query is not considered.
    pub fn has_active_filters(&self) -> bool {
        self.lock_filter != LockFilter::default() || self.sort_key != SortKey::default()
    }

    pub fn is_filtering(&self) -> bool {
        !self.query.is_empty() || self.lock_filter != LockFilter::All
    }
}

fn matches_query(album: &Album, query_lower: &str) -> bool {
    query_lower.is_empty()
        || album.title.to_lowercase().contains(query_lower)
        || album.publisher_name.to_lowercase().contains(query_lower)
}

/// Case-insensitive comparison first, exact comparison to order otherwise equal titles
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Albums passing the query and lock filter, ordered by `sort_key`. The sort is stable.
pub fn derive_view<'a>(
    albums: &'a [Album],
    query: &str,
    lock_filter: LockFilter,
    sort_key: SortKey,
    count_mode: CountMode,
) -> Vec<&'a Album> {
    let query_lower = query.to_lowercase();
    let mut view: Vec<&Album> = albums
        .iter()
        .filter(|album| matches_query(album, &query_lower) && lock_filter.admits(album))
        .collect();
    match sort_key {
        SortKey::Title => view.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::DateNewest => view.sort_by(|a, b| b.publish_date.cmp(&a.publish_date)),
        SortKey::DateOldest => view.sort_by(|a, b| a.publish_date.cmp(&b.publish_date)),
        SortKey::Items => {
            view.sort_by(|a, b| b.item_count(count_mode).cmp(&a.item_count(count_mode)))
        }
    }
    view
}

/// Albums whose title contains `query`, for search-as-you-type
pub fn suggestions<'a>(albums: &'a [Album], query: &str) -> Vec<&'a Album> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let query_lower = query.to_lowercase();
    albums
        .iter()
        .filter(|album| album.title.to_lowercase().contains(&query_lower))
        .take(MAX_SUGGESTIONS)
        .collect()
}
