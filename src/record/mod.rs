//! Canonical catalog records
//!
//! A [`CanonicalRecord`] is built once per crawl attempt by [`normalize`],
//! handed to the store, and dropped.

mod normalize;

pub use normalize::normalize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication status derived from the original volume-count text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    InProgress,
    Completed,
    #[default]
    Unknown,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }

    /// Parses the stored representation; anything unrecognized is `Unknown`
    pub fn from_db_string(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for PublicationStatus {
    type Err = String;

    /// Strict parse of the stored representation, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!(
                "unknown status '{}' (expected one of: in_progress, completed, unknown)",
                other
            )),
        }
    }
}

impl fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A volume of the standard edition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardVolume {
    /// Volume number, always >= 1
    pub number: u32,
    pub image_url: Option<String>,
}

/// A special, collector or boxed-set item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledVolume {
    pub label: String,
    pub image_url: Option<String>,
}

/// The three edition categories of a catalog item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSet {
    #[serde(default)]
    pub standard: Vec<StandardVolume>,
    #[serde(default)]
    pub special: Vec<LabeledVolume>,
    /// Collector items followed by boxed-set items
    #[serde(default)]
    pub collector: Vec<LabeledVolume>,
}

impl VolumeSet {
    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.special.is_empty() && self.collector.is_empty()
    }
}

/// The normalized representation of one catalog page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub source_url: String,
    pub title: String,
    pub original_title: Option<String>,
    pub origin: Option<String>,
    pub release_year: Option<String>,
    pub work_type: Option<String>,
    pub genres: Vec<String>,
    pub themes: Vec<String>,
    pub author: Option<String>,
    pub translator: Option<String>,
    pub publisher_original: Option<String>,
    pub publisher_local: Option<String>,
    pub volume_count_original: Option<String>,
    pub volume_count_local: Option<String>,
    pub price: Option<String>,
    pub status: PublicationStatus,
    pub volumes: VolumeSet,
    pub scraped_at: DateTime<Utc>,
}

/// A record as it lives in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
