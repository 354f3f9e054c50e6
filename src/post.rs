//! Defines the [`Post`] type and the assembly of a single post from a raw
//! source [`Document`].

use crate::frontmatter::{self, Metadata};
use crate::markdown::{self, Converter};
use crate::slug::slugify;
use std::collections::BTreeMap;

/// The unparsed contents of one source file.
pub struct Document<'a> {
    /// The file stem, e.g. `hello` for `posts/hello.md`.
    pub name: &'a str,
    pub text: &'a str,
}

/// A fully assembled post. Posts are built once by [`Post::assemble`] and are
/// only handed out by shared reference afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub title: String,

    /// The `date` frontmatter field as written. Ordering compares it as a
    /// plain string.
    pub date: String,

    pub author: String,
    pub tags: Vec<String>,

    /// Derived from `title`. May be empty and may collide with another
    /// post's slug.
    pub slug: String,

    /// The body rendered to HTML.
    pub content: String,

    /// The source file stem, for diagnostics.
    pub source_name: String,

    /// Frontmatter keys other than the four recognized ones.
    pub extra: BTreeMap<String, String>,
}

impl Post {
    /// Parses `document`, converts its body with `converter`, and derives the
    /// slug. The only failure is the converter's.
    pub fn assemble(
        document: &Document,
        converter: &dyn Converter,
    ) -> markdown::Result<Post> {
        Post::assemble_with(document, converter, Metadata::default())
    }

    /// Like [`Post::assemble`], but with explicit default metadata.
    pub fn assemble_with(
        document: &Document,
        converter: &dyn Converter,
        defaults: Metadata,
    ) -> markdown::Result<Post> {
        let (metadata, body) = frontmatter::parse_with(document.text, defaults);
        let content = converter.to_html(body)?;
        Ok(Post {
            slug: slugify(&metadata.title),
            title: metadata.title,
            date: metadata.date,
            author: metadata.author,
            tags: metadata.tags,
            content,
            source_name: document.name.to_owned(),
            extra: metadata.extra,
        })
    }
}
