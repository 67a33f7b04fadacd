//! livemd HTML
//!
//! HTML5 parser built on html5ever, producing a [`livemd_dom::Document`], and
//! the matching serializer.

mod parser;
mod serializer;

pub use livemd_dom::Document;
pub use parser::HtmlParser;
pub use serializer::{get_inner_html, get_outer_html, HtmlSerializer};

/// Parse an HTML string into a document at `about:blank`
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("DOM construction failed: {0}")]
    Dom(#[from] livemd_dom::DomError),
}
