//! Page extraction
//!
//! Two independent extractors work over the same parsed [`Document`]:
//! - [`extract_fields`] reads the labeled metadata list and the title
//! - [`VolumeExtractor`] reads the edition galleries
//!
//! Neither fails; absent data shows up as empty values and warnings.

mod fields;
mod images;
mod volumes;

pub use fields::{detect_status, extract_fields, ExtractionWarning, FieldLabel, RawFieldBag};
pub use images::full_resolution_url;
pub use volumes::{
    default_edition_strategy, extract_volumes, flat_cells_strategy, StandardStrategy,
    VolumeExtractor,
};

use crate::document::{Document, HtmlDocument};
use crate::record::VolumeSet;
use url::Url;

/// Everything pulled out of one page before normalization
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    pub fields: RawFieldBag,
    pub volumes: VolumeSet,
    pub warnings: Vec<ExtractionWarning>,
}

/// Runs both extractors over an already parsed document
pub fn extract_document<D: Document>(document: &D, origin: &Url) -> ExtractedPage {
    let (fields, warnings) = extract_fields(document);
    let volumes = extract_volumes(document, origin);

    ExtractedPage {
        fields,
        volumes,
        warnings,
    }
}

/// Parses raw HTML and runs both extractors
pub fn extract_page(raw_html: &str, origin: &Url) -> ExtractedPage {
    let document = HtmlDocument::parse(raw_html);
    extract_document(&document, origin)
}
