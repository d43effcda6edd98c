//! Queryable wrapper around a parsed HTML document.

use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;

/// Compile a CSS selector, reporting failures as parse errors
pub fn compile(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::parse(format!("invalid selector {:?}: {}", css, e)))
}

/// Collected, trimmed text content of an element
pub fn text_of(elem: &ElementRef) -> String {
    elem.text().collect::<String>().trim().to_string()
}

/// Whether any descendant of `elem` matching `selector` has text containing `needle`
pub fn has_text(elem: &ElementRef, selector: &Selector, needle: &str) -> bool {
    elem.select(selector)
        .any(|child| child.text().collect::<String>().contains(needle))
}

/// Nearest ancestor of `elem` (itself included) matching `selector`
pub fn closest<'a>(elem: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    if selector.matches(&elem) {
        return Some(elem);
    }
    elem.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| selector.matches(ancestor))
}

/// Parsed page
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse markup text.
    ///
    /// html5ever accepts any input, so the only rejected document is one
    /// with no content at all.
    pub fn parse(markup: &str) -> Result<Self, ScrapeError> {
        if markup.trim().is_empty() {
            return Err(ScrapeError::parse("empty document"));
        }
        Ok(Self {
            html: Html::parse_document(markup),
        })
    }

    /// All elements matching `css`, in document order
    pub fn select_all(&self, css: &str) -> Result<Vec<ElementRef<'_>>, ScrapeError> {
        let selector = compile(css)?;
        Ok(self.html.select(&selector).collect())
    }

    /// All elements matching `css` that contain a `text_css` descendant whose text contains `needle`
    pub fn select_containing(
        &self,
        css: &str,
        text_css: &str,
        needle: &str,
    ) -> Result<Vec<ElementRef<'_>>, ScrapeError> {
        let text_selector = compile(text_css)?;
        Ok(self
            .select_all(css)?
            .into_iter()
            .filter(|elem| has_text(elem, &text_selector, needle))
            .collect())
    }
}
