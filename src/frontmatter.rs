//! Splits a raw post document into its frontmatter [`Metadata`] and its body
//! text. The frontmatter is an optional block of `key: value` lines fenced by
//! `---`:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! tags: greet, meta
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! Parsing never fails. Documents without a leading fence, and documents whose
//! opening fence is never closed, fall back to the default [`Metadata`]. See
//! [`Frontmatter`] for the exact body returned in each case.

use std::collections::BTreeMap;

const FENCE: &str = "---";

/// The title of a post whose frontmatter doesn't name one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// The author of a post whose frontmatter doesn't name one.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// The lexical form of the default `date` field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Straight and curly quotes. One layer is stripped from values.
const QUOTES: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// The fields of a frontmatter block. The four recognized fields are typed;
/// every other `key: value` line lands in `extra` under its own key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,

    /// Free text. Posts are ordered by comparing this as a plain string, so
    /// `YYYY-MM-DD` is the only form that sorts chronologically.
    pub date: String,

    pub tags: Vec<String>,
    pub author: String,
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    /// Constructs the default metadata with `date` as the default date.
    pub fn new<S: Into<String>>(date: S) -> Metadata {
        Metadata {
            title: DEFAULT_TITLE.to_owned(),
            date: date.into(),
            tags: Vec::new(),
            author: DEFAULT_AUTHOR.to_owned(),
            extra: BTreeMap::new(),
        }
    }

    /// Sets a single field. `tags` is split on commas; unrecognized keys are
    /// stored in `extra`.
    pub fn insert(&mut self, key: &str, value: &str) {
        match key {
            "title" => self.title = value.to_owned(),
            "date" => self.date = value.to_owned(),
            "author" => self.author = value.to_owned(),
            "tags" => self.tags = split_tags(value),
            _ => {
                self.extra.insert(key.to_owned(), value.to_owned());
            }
        }
    }
}

impl Default for Metadata {
    /// Default metadata dated today.
    fn default() -> Metadata {
        Metadata::new(today())
    }
}

/// Today's local date in [`DATE_FORMAT`].
pub fn today() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}

/// The shape of a document's header. Each variant carries the body text
/// that the rest of the pipeline should render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frontmatter<'a> {
    /// The document doesn't begin with `---`. The body is the whole document,
    /// untouched.
    Missing(&'a str),

    /// The header was fenced on both sides. Both the header and the body are
    /// trimmed.
    Fenced { header: &'a str, body: &'a str },

    /// The document begins with `---` but no closing `---` follows. The body
    /// is the whole document, opening fence included, and the metadata is
    /// the default.
    Unterminated(&'a str),
}

impl<'a> Frontmatter<'a> {
    /// Locates the header in `input`. The closing fence is the first `---`
    /// after the opening one, even if it sits in the middle of a line.
    pub fn split(input: &'a str) -> Frontmatter<'a> {
        if !input.starts_with(FENCE) {
            return Frontmatter::Missing(input);
        }
        match input[FENCE.len()..].find(FENCE) {
            None => Frontmatter::Unterminated(input),
            Some(offset) => {
                let header_stop = FENCE.len() + offset;
                Frontmatter::Fenced {
                    header: input[FENCE.len()..header_stop].trim(),
                    body: input[header_stop + FENCE.len()..].trim(),
                }
            }
        }
    }

    /// The body text to hand to the markdown converter.
    pub fn body(&self) -> &'a str {
        match *self {
            Frontmatter::Missing(body) => body,
            Frontmatter::Fenced { body, .. } => body,
            Frontmatter::Unterminated(body) => body,
        }
    }

    /// Applies the header lines on top of `defaults`. Lines without a `:` are
    /// ignored; a line starting with `:` sets the empty key in `extra`.
    pub fn resolve(&self, defaults: Metadata) -> Metadata {
        let header = match *self {
            Frontmatter::Fenced { header, .. } => header,
            _ => return defaults,
        };

        let mut metadata = defaults;
        for line in header.lines() {
            if let Some((key, value)) = line.split_once(':') {
                metadata.insert(key.trim(), strip_quotes(value.trim()));
            }
        }
        metadata
    }
}

/// Parses `input` into its metadata and body, defaulting the date to today.
pub fn parse(input: &str) -> (Metadata, &str) {
    parse_with(input, Metadata::default())
}

/// Like [`parse`], but starts from the provided `defaults`.
pub fn parse_with(input: &str, defaults: Metadata) -> (Metadata, &str) {
    let frontmatter = Frontmatter::split(input);
    (frontmatter.resolve(defaults), frontmatter.body())
}

fn strip_quotes(value: &str) -> &str {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if QUOTES.contains(&first) && QUOTES.contains(&last) => {
            chars.as_str()
        }
        _ => value,
    }
}

// An empty `tags:` line yields no tags rather than one empty tag.
fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}
