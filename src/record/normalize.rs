use crate::extract::RawFieldBag;
use crate::record::{CanonicalRecord, VolumeSet};
use chrono::Utc;

/// Builds the canonical record for one crawl attempt
///
/// Empty scalar fields become `None`, an undetected status becomes
/// `Unknown`, and the title is kept even when empty. `scraped_at` is the
/// current UTC time.
pub fn normalize(raw: RawFieldBag, volumes: VolumeSet, source_url: &str) -> CanonicalRecord {
    CanonicalRecord {
        source_url: source_url.to_string(),
        title: raw.title,
        original_title: non_empty(raw.original_title),
        origin: non_empty(raw.origin),
        release_year: non_empty(raw.release_year),
        work_type: non_empty(raw.work_type),
        genres: raw.genres,
        themes: raw.themes,
        author: non_empty(raw.author),
        translator: non_empty(raw.translator),
        publisher_original: non_empty(raw.publisher_original),
        publisher_local: non_empty(raw.publisher_local),
        volume_count_original: non_empty(raw.volume_count_original),
        volume_count_local: non_empty(raw.volume_count_local),
        price: non_empty(raw.price),
        status: raw.status.unwrap_or_default(),
        volumes,
        scraped_at: Utc::now(),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}
