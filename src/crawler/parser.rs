//! Turns a fetched page into a canonical record
//!
//! Pure computation: parse, run both extractors, normalize. The coordinator
//! runs this on the blocking pool under the extraction timeout.

use crate::extract::{extract_page, ExtractionWarning};
use crate::record::{normalize, CanonicalRecord};
use url::Url;

/// A normalized record plus the warnings raised while extracting it
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub record: CanonicalRecord,
    pub warnings: Vec<ExtractionWarning>,
}

/// Parses raw HTML into a [`ParsedPage`]
///
/// # Arguments
///
/// * `html` - The page body
/// * `origin` - Site origin image paths are resolved against
/// * `source_url` - Canonical URL the page was fetched from
pub fn parse_page(html: &str, origin: &Url, source_url: &str) -> ParsedPage {
    let extracted = extract_page(html, origin);

    for warning in &extracted.warnings {
        tracing::debug!("{}: {}", source_url, warning);
    }

    ParsedPage {
        record: normalize(extracted.fields, extracted.volumes, source_url),
        warnings: extracted.warnings,
    }
}
