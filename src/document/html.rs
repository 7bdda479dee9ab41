//! `scraper`-backed implementation of the document traits
//!
//! Parsing never fails: html5ever recovers a best-effort tree from any input.

use crate::document::{Document, Node};
use scraper::{ElementRef, Html, Selector};

/// A parsed HTML page
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parses a full HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use manga_catalog::document::{Document, HtmlDocument, Node};
    ///
    /// let doc = HtmlDocument::parse("<h1>Gachiakuta</h1>");
    /// assert_eq!(doc.find("h1")[0].text(), "Gachiakuta");
    /// ```
    pub fn parse(raw_html: &str) -> Self {
        Self {
            html: Html::parse_document(raw_html),
        }
    }
}

/// One element of an [`HtmlDocument`]
#[derive(Debug, Clone, Copy)]
pub struct HtmlNode<'a> {
    element: ElementRef<'a>,
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!("Ignoring invalid selector {:?}: {:?}", selector, e);
            None
        }
    }
}

impl Document for HtmlDocument {
    type Node<'a> = HtmlNode<'a>;

    fn find(&self, selector: &str) -> Vec<HtmlNode<'_>> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .map(|element| HtmlNode { element })
            .collect()
    }
}

impl<'a> Node for HtmlNode<'a> {
    fn find(&self, selector: &str) -> Vec<Self> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };

        let own_id = self.element.id();
        self.element
            .select(&selector)
            .filter(|element| element.id() != own_id)
            .map(|element| HtmlNode { element })
            .collect()
    }

    fn text(&self) -> String {
        self.element.text().collect()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.element.value().attr(name).map(str::to_string)
    }

    fn next_element_sibling(&self) -> Option<Self> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(|element| HtmlNode { element })
    }
}
