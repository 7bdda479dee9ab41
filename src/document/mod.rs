//! Typed node-query capability over parsed pages
//!
//! Extractors only see the [`Document`] and [`Node`] traits. The concrete
//! implementation on top of `scraper` lives in [`html`].

mod html;

pub use html::{HtmlDocument, HtmlNode};

/// A queryable element of a parsed page
pub trait Node: Sized {
    /// Descendants of this node matching a CSS selector, in document order
    ///
    /// The node itself is never part of the result. Invalid selectors match
    /// nothing.
    fn find(&self, selector: &str) -> Vec<Self>;

    /// Concatenated text of the node and all of its descendants
    fn text(&self) -> String;

    /// Value of an attribute, if present
    fn attr(&self, name: &str) -> Option<String>;

    /// The next sibling that is an element, skipping text and comments
    fn next_element_sibling(&self) -> Option<Self>;

    /// Descendants matching `selector` whose text contains `needle`
    fn find_containing(&self, selector: &str, needle: &str) -> Vec<Self> {
        self.find(selector)
            .into_iter()
            .filter(|node| node.text().contains(needle))
            .collect()
    }
}

/// A parsed page
pub trait Document {
    type Node<'a>: Node
    where
        Self: 'a;

    /// Elements matching a CSS selector, in document order
    fn find(&self, selector: &str) -> Vec<Self::Node<'_>>;

    /// Elements matching `selector` whose text contains `needle`
    ///
    /// This is how section headings such as `h3` "Volume simple" are located.
    fn find_containing(&self, selector: &str, needle: &str) -> Vec<Self::Node<'_>> {
        self.find(selector)
            .into_iter()
            .filter(|node| node.text().contains(needle))
            .collect()
    }
}

/// Collects every `selector` match inside the element that directly follows
/// each of `anchors`
///
/// Page sections are encoded as a heading followed by a sibling container,
/// so this is the "content under heading" query.
pub fn find_after<N: Node>(anchors: &[N], selector: &str) -> Vec<N> {
    anchors
        .iter()
        .filter_map(Node::next_element_sibling)
        .flat_map(|scope| scope.find(selector))
        .collect()
}

/// Collapses whitespace runs to single spaces and trims both ends
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
