//! Label-driven field extraction
//!
//! Detail pages list their metadata as `<li>` items shaped like
//! `Label : value`. Each item is claimed by the first label it contains, in
//! the precedence order of [`FieldLabel::ALL`].

use crate::document::{normalize_ws, Document, Node};
use crate::record::PublicationStatus;
use serde::{Serialize, Serializer};
use std::fmt;

/// The edit-link text that site editors see appended to the page heading
const EDIT_LINK_ARTIFACT: &str = "Modifier";

/// Separator used by multi-valued fields such as genres
const MULTI_VALUE_SEPARATOR: &str = " - ";

/// A recognized metadata label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLabel {
    OriginalTitle,
    Origin,
    ReleaseYear,
    WorkType,
    Genres,
    Themes,
    Author,
    Translator,
    PublisherOriginal,
    PublisherLocal,
    VolumeCountOriginal,
    VolumeCountLocal,
    Price,
}

impl FieldLabel {
    /// Every label, in matching precedence order
    pub const ALL: [FieldLabel; 13] = [
        Self::OriginalTitle,
        Self::Origin,
        Self::ReleaseYear,
        Self::WorkType,
        Self::Genres,
        Self::Themes,
        Self::Author,
        Self::Translator,
        Self::PublisherOriginal,
        Self::PublisherLocal,
        Self::VolumeCountOriginal,
        Self::VolumeCountLocal,
        Self::Price,
    ];

    /// The text that marks this label inside an item
    pub fn marker(&self) -> &'static str {
        match self {
            Self::OriginalTitle => "Titre original :",
            Self::Origin => "Origine :",
            Self::ReleaseYear => "Année VF :",
            Self::WorkType => "Type :",
            Self::Genres => "Genres :",
            Self::Themes => "Thèmes :",
            Self::Author => "Auteur :",
            Self::Translator => "Traducteur :",
            Self::PublisherOriginal => "Éditeur VO :",
            Self::PublisherLocal => "Éditeur VF :",
            Self::VolumeCountOriginal => "Nb volumes VO :",
            Self::VolumeCountLocal => "Nb volumes VF :",
            Self::Price => "Prix :",
        }
    }

    /// The label name without the trailing colon
    pub fn name(&self) -> &'static str {
        self.marker().trim_end_matches(':').trim_end()
    }

    fn is_multi_valued(&self) -> bool {
        matches!(self, Self::Genres | Self::Themes)
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FieldLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A non-fatal problem found while extracting one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "label")]
pub enum ExtractionWarning {
    /// No item carried this label
    MissingField(FieldLabel),

    /// The page heading was empty once the edit link was removed
    EmptyTitle,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(label) => write!(f, "missing field: {}", label),
            Self::EmptyTitle => f.write_str("empty title"),
        }
    }
}

/// Raw, untyped values pulled from one page
///
/// Absent scalar fields are empty strings; the normalizer decides what
/// absence means downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldBag {
    pub title: String,
    pub original_title: String,
    pub origin: String,
    pub release_year: String,
    pub work_type: String,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub author: String,
    pub translator: String,
    pub publisher_original: String,
    pub publisher_local: String,
    pub volume_count_original: String,
    pub volume_count_local: String,
    pub price: String,

    /// Status marker found in the original volume count, if any
    pub status: Option<PublicationStatus>,
}

impl RawFieldBag {
    fn scalar_mut(&mut self, label: FieldLabel) -> Option<&mut String> {
        let slot = match label {
            FieldLabel::OriginalTitle => &mut self.original_title,
            FieldLabel::Origin => &mut self.origin,
            FieldLabel::ReleaseYear => &mut self.release_year,
            FieldLabel::WorkType => &mut self.work_type,
            FieldLabel::Author => &mut self.author,
            FieldLabel::Translator => &mut self.translator,
            FieldLabel::PublisherOriginal => &mut self.publisher_original,
            FieldLabel::PublisherLocal => &mut self.publisher_local,
            FieldLabel::VolumeCountOriginal => &mut self.volume_count_original,
            FieldLabel::VolumeCountLocal => &mut self.volume_count_local,
            FieldLabel::Price => &mut self.price,
            FieldLabel::Genres | FieldLabel::Themes => return None,
        };
        Some(slot)
    }

    fn assign(&mut self, label: FieldLabel, value: String) {
        if label.is_multi_valued() {
            let parts = split_multi_value(&value);
            match label {
                FieldLabel::Genres => self.genres = parts,
                _ => self.themes = parts,
            }
        } else if let Some(slot) = self.scalar_mut(label) {
            *slot = value;
        }
    }
}

/// Extracts the labeled metadata and the title of a page
pub fn extract_fields<D: Document>(document: &D) -> (RawFieldBag, Vec<ExtractionWarning>) {
    let mut bag = RawFieldBag::default();
    let mut warnings = Vec::new();
    let mut claimed = [false; FieldLabel::ALL.len()];

    bag.title = extract_title(document);
    if bag.title.is_empty() {
        warnings.push(ExtractionWarning::EmptyTitle);
    }

    for item in document.find("li") {
        let text = item.text();
        let Some(index) = FieldLabel::ALL
            .iter()
            .position(|label| text.contains(label.marker()))
        else {
            continue;
        };

        // Later items with an already-claimed label are ignored
        if claimed[index] {
            continue;
        }
        claimed[index] = true;
        bag.assign(FieldLabel::ALL[index], value_after_colon(&text));
    }

    bag.status = detect_status(&bag.volume_count_original);

    for (label, was_claimed) in FieldLabel::ALL.iter().zip(claimed) {
        if !was_claimed {
            warnings.push(ExtractionWarning::MissingField(*label));
        }
    }

    (bag, warnings)
}

/// First `h1` text with the edit link removed
fn extract_title<D: Document>(document: &D) -> String {
    document
        .find("h1")
        .first()
        .map(|heading| {
            let text = heading.text().replacen(EDIT_LINK_ARTIFACT, "", 1);
            normalize_ws(&text)
        })
        .unwrap_or_default()
}

/// Everything after the first colon, whitespace-collapsed
fn value_after_colon(text: &str) -> String {
    text.split_once(':')
        .map(|(_, value)| normalize_ws(value))
        .unwrap_or_default()
}

/// Splits on the separator, including one left at either end by trimming
fn split_multi_value(value: &str) -> Vec<String> {
    format!(" {} ", value)
        .split(MULTI_VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the publication status marker from a volume-count text
///
/// `(En cours)` is checked before `(Terminé)`.
pub fn detect_status(volume_count: &str) -> Option<PublicationStatus> {
    if volume_count.contains("(En cours)") {
        Some(PublicationStatus::InProgress)
    } else if volume_count.contains("(Terminé)") {
        Some(PublicationStatus::Completed)
    } else {
        None
    }
}
