//! Converts post bodies from markdown to HTML. The pipeline only depends on
//! the [`Converter`] trait; [`Markdown`] is the pulldown-cmark implementation
//! used by the real build.

use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::fmt;
use std::io;

/// Turns markdown text into HTML. Implementations must be pure: the same
/// input always produces the same output.
pub trait Converter {
    fn to_html(&self, markdown: &str) -> Result<String>;
}

/// The pulldown-cmark converter with tables enabled and fenced code blocks
/// wrapped in `codehilite` markup for the stylesheet to pick up.
pub struct Markdown {
    options: Options,
}

impl Markdown {
    pub fn new() -> Markdown {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        Markdown { options }
    }
}

impl Default for Markdown {
    fn default() -> Markdown {
        Markdown::new()
    }
}

impl Converter for Markdown {
    fn to_html(&self, markdown: &str) -> Result<String> {
        let mut events = Vec::new();
        for ev in Parser::new_ext(markdown, self.options) {
            events.push(convert(ev)?);
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        Ok(out)
    }
}

// Code blocks are emitted as raw HTML so the language lands on the `<code>`
// element inside a `codehilite` wrapper. The text events in between are still
// escaped by `push_html`.
fn convert(ev: Event) -> Result<Event> {
    Ok(match ev {
        Event::Start(Tag::CodeBlock(kind)) => {
            let mut open = String::from(r#"<div class="codehilite"><pre><code"#);
            if let CodeBlockKind::Fenced(info) = kind {
                if let Some(lang) = info.split_whitespace().next() {
                    open.push_str(r#" class="language-"#);
                    escape_html(&mut open, lang)?;
                    open.push('"');
                }
            }
            open.push('>');
            Event::Html(CowStr::from(open))
        }
        Event::End(Tag::CodeBlock(_)) => Event::Html(CowStr::Borrowed("</code></pre></div>\n")),
        _ => ev,
    })
}

/// The result of a markdown conversion.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error converting markdown to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O errors while writing HTML.
    Io(io::Error),

    /// Returned by converters that reject their input.
    Rejected(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Rejected(reason) => write!(f, "markdown rejected: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Rejected(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
