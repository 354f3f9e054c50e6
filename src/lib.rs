//! The library code for the `quill` static blog generator. A build runs in
//! three steps:
//!
//! 1. Parsing posts from the markdown files in the source directory
//!    ([`crate::parser`]). Each file is split into frontmatter and body
//!    ([`crate::frontmatter`]), the body is converted to HTML
//!    ([`crate::markdown`]), and the title is turned into a slug
//!    ([`crate::slug`]). A file that fails is skipped and reported; the
//!    surviving posts are sorted by date, newest first.
//! 2. Rendering an index page for the whole collection and a page per post
//!    ([`crate::render`]).
//! 3. Writing the pages and the stylesheet under the output directory
//!    ([`crate::write`]).
//!
//! [`crate::build::build_site`] runs all three.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod frontmatter;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod render;
pub mod slug;
mod value;
pub mod write;
