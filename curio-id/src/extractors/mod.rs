//! Product page heuristics
//!
//! Each record field is filled by a heuristic cascade: an ordered list of
//! named strategies, each returning `None` on a miss. The first hit wins and
//! the rest are never evaluated.
//!
//! Strategies are plain functions over a parsed [`scraper::Html`] document so
//! they can be tested one by one.

pub mod product_page;
pub mod text;

pub use product_page::extract_product;

use scraper::{ElementRef, Html, Selector};

/// Inputs that are not part of the HTML but shape extraction
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// Latest plausible release year is `current_year + 1`
    pub current_year: i32,
    /// Brand used when the page names none
    pub default_brand: String,
}

/// Ordered list of named strategies for one field
pub struct Cascade<'a, T> {
    field: &'static str,
    strategies: Vec<(&'static str, Box<dyn Fn() -> Option<T> + 'a>)>,
}

impl<'a, T> Cascade<'a, T> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy; strategies run in the order they were added
    pub fn then(mut self, name: &'static str, strategy: impl Fn() -> Option<T> + 'a) -> Self {
        self.strategies.push((name, Box::new(strategy)));
        self
    }

    /// Run strategies until one hits
    pub fn run(self) -> Option<T> {
        for (name, strategy) in self.strategies {
            if let Some(value) = strategy() {
                tracing::debug!(field = self.field, strategy = name, "Heuristic hit");
                return Some(value);
            }
        }
        tracing::debug!(field = self.field, "No heuristic matched");
        None
    }
}

/// Parse a CSS selector; heuristics treat an unparsable selector as a miss
pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!(css, error = ?e, "Invalid selector");
            None
        }
    }
}

/// Concatenated descendant text of an element
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Trimmed text of the first element matching `css`, if non-empty
///
/// Only the first match is consulted: an empty first match is a miss.
pub(crate) fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    let element = document.select(&selector).next()?;
    text::non_empty(&element_text(&element))
}

/// Trimmed `content` attribute of the first matching `<meta>`, if non-empty
pub(crate) fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    let element = document.select(&selector).next()?;
    text::non_empty(element.value().attr("content")?)
}

/// Next sibling that is an element, skipping text and comment nodes
pub(crate) fn next_element_sibling<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
