//! Volume gallery extraction
//!
//! The standard edition gallery has appeared under several markups over the
//! years. Each known markup is one strategy; strategies run in order and the
//! first one producing volumes wins. Having none is a valid outcome.

use crate::document::{find_after, Document, Node};
use crate::extract::images::full_resolution_url;
use crate::record::{LabeledVolume, StandardVolume, VolumeSet};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static VOLUME_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Vol\.\s*(\d+)").expect("volume number pattern is valid"));

const DEFAULT_EDITION_HEADING: &str = "Édition par défaut";
const STANDARD_HEADING: &str = "Volume simple";

/// A way of reading the standard edition gallery
///
/// Returns `None` when the markup it understands is absent.
pub type StandardStrategy<D> = fn(&D, &Url) -> Option<Vec<StandardVolume>>;

/// A section of labeled items introduced by an `h3` heading
struct LabeledSection {
    heading: &'static str,
    default_label: &'static str,
}

const SPECIAL: LabeledSection = LabeledSection {
    heading: "Spécial",
    default_label: "Volume spécial",
};

const COLLECTOR: LabeledSection = LabeledSection {
    heading: "Collector",
    default_label: "Volume collector",
};

const BOXED_SET: LabeledSection = LabeledSection {
    heading: "Coffret",
    default_label: "Coffret",
};

/// Extracts the [`VolumeSet`] of a page, resolving images against a site
/// origin
#[derive(Debug, Clone)]
pub struct VolumeExtractor {
    origin: Url,
}

impl VolumeExtractor {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    /// Standard-edition strategies in the order they are tried
    pub fn standard_strategies<D: Document>() -> [StandardStrategy<D>; 2] {
        [default_edition_strategy::<D>, flat_cells_strategy::<D>]
    }

    pub fn extract<D: Document>(&self, document: &D) -> VolumeSet {
        let standard = Self::standard_strategies::<D>()
            .iter()
            .find_map(|strategy| {
                strategy(document, &self.origin).filter(|volumes| !volumes.is_empty())
            })
            .unwrap_or_default();

        let special = labeled_section(document, &SPECIAL, &self.origin);
        let mut collector = labeled_section(document, &COLLECTOR, &self.origin);
        collector.extend(labeled_section(document, &BOXED_SET, &self.origin));

        VolumeSet {
            standard,
            special,
            collector,
        }
    }
}

/// Convenience wrapper around [`VolumeExtractor::extract`]
pub fn extract_volumes<D: Document>(document: &D, origin: &Url) -> VolumeSet {
    VolumeExtractor::new(origin.clone()).extract(document)
}

/// `h2` "Édition par défaut", then its `h3` "Volume simple", then every image
///
/// Volumes are numbered by position.
pub fn default_edition_strategy<D: Document>(
    document: &D,
    origin: &Url,
) -> Option<Vec<StandardVolume>> {
    let editions = document.find_containing("h2", DEFAULT_EDITION_HEADING);
    let headings: Vec<_> = editions
        .iter()
        .filter_map(Node::next_element_sibling)
        .flat_map(|section| section.find_containing("h3", STANDARD_HEADING))
        .collect();

    let images = find_after(&headings, "img");
    if images.is_empty() {
        return None;
    }

    let volumes = images
        .iter()
        .zip(1u32..)
        .map(|(image, number)| StandardVolume {
            number,
            image_url: full_resolution_url(image.attr("src").as_deref(), origin),
        })
        .collect();
    Some(volumes)
}

/// `h3` "Volume simple" followed by a container of `div.unVol` cells
///
/// The number comes from the cell link's `title` (`Vol. N`) when it holds a
/// positive number, otherwise from the cell position.
pub fn flat_cells_strategy<D: Document>(
    document: &D,
    origin: &Url,
) -> Option<Vec<StandardVolume>> {
    let headings = document.find_containing("h3", STANDARD_HEADING);
    let cells = find_after(&headings, "div.unVol");
    if cells.is_empty() {
        return None;
    }

    let volumes = cells
        .iter()
        .zip(1u32..)
        .map(|(cell, position)| {
            let link = cell.find("a").into_iter().next();
            let number = link
                .as_ref()
                .and_then(|link| link.attr("title"))
                .and_then(|title| volume_number(&title))
                .unwrap_or(position);
            let src = link
                .as_ref()
                .and_then(|link| link.find("img").into_iter().next())
                .and_then(|image| image.attr("src"));

            StandardVolume {
                number,
                image_url: full_resolution_url(src.as_deref(), origin),
            }
        })
        .collect();
    Some(volumes)
}

/// Parses `Vol. N` out of a link title; zero is not a volume number
fn volume_number(title: &str) -> Option<u32> {
    VOLUME_NUMBER
        .captures(title)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse::<u32>().ok())
        .filter(|number| *number >= 1)
}

fn labeled_section<D: Document>(
    document: &D,
    section: &LabeledSection,
    origin: &Url,
) -> Vec<LabeledVolume> {
    let headings = document.find_containing("h3", section.heading);

    find_after(&headings, "img")
        .iter()
        .zip(1u32..)
        .map(|(image, position)| {
            let label = image
                .attr("alt")
                .map(|alt| alt.trim().to_string())
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| format!("{} {}", section.default_label, position));

            LabeledVolume {
                label,
                image_url: full_resolution_url(image.attr("src").as_deref(), origin),
            }
        })
        .collect()
}
