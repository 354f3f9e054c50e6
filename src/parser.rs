//! Defines the [`Parser`], [`Posts`], and [`Error`] types: the logic for
//! discovering post files on disk, assembling each into a [`Post`], and
//! ordering the results.

use crate::markdown::{self, Converter};
use crate::post::{Document, Post};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    converter: &'a dyn Converter,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser that renders post bodies with `converter`.
    pub fn new(converter: &'a dyn Converter) -> Parser<'a> {
        Parser { converter }
    }

    /// Searches `source_directory` (not its subdirectories) for post files
    /// (extension = `.md`), assembles each, and returns the posts sorted by
    /// date, most recent first.
    ///
    /// A post that can't be read or converted is skipped and recorded in
    /// [`Posts::failures`]; it never stops the other posts. Only a missing or
    /// unreadable `source_directory` is an error.
    ///
    /// Files are visited in file-name order, which is also the order of
    /// posts that share a date.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Posts> {
        if !source_directory.is_dir() {
            return Err(Error::SourceUnavailable(source_directory.to_owned()));
        }

        let mut paths = Vec::new();
        let mut failures = Vec::new();
        let walker = WalkDir::new(source_directory)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walker {
            match result {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_markdown(entry.path()) {
                        paths.push(entry.into_path());
                    }
                }
                Err(err) if err.depth() == 0 => return Err(Error::Walk(err)),
                Err(err) => match err.path().map(Path::to_owned) {
                    Some(path) if is_markdown(&path) => {
                        let failure = DocumentError {
                            path,
                            cause: Cause::Walk(err),
                        };
                        warn!("{}", failure);
                        failures.push(failure);
                    }
                    _ => debug!("skipping unreadable entry: {}", err),
                },
            }
        }
        let discovered = paths.len() + failures.len();
        info!(
            "found {} markdown files in `{}`",
            discovered,
            source_directory.display()
        );

        let mut posts = Vec::with_capacity(paths.len());
        for path in paths.iter() {
            match self.parse_post(path) {
                Ok(post) => {
                    info!(
                        title = %post.title,
                        slug = %post.slug,
                        "processed `{}`",
                        path.display()
                    );
                    posts.push(post);
                }
                Err(err) => {
                    warn!("{}", err);
                    failures.push(err);
                }
            }
        }

        Ok(Posts::new(posts, failures, discovered))
    }

    /// Reads and assembles a single [`Post`] from the file at `path`.
    fn parse_post(&self, path: &Path) -> std::result::Result<Post, DocumentError> {
        let annotate = |cause: Cause| DocumentError {
            path: path.to_owned(),
            cause,
        };

        let text = std::fs::read_to_string(path).map_err(|e| annotate(Cause::Read(e)))?;
        let name = path
            .file_stem()
            .map(OsStr::to_string_lossy)
            .unwrap_or_default();
        debug!("assembling `{}` ({} bytes)", path.display(), text.len());

        Post::assemble(
            &Document {
                name: &name,
                text: &text,
            },
            self.converter,
        )
        .map_err(|e| annotate(Cause::Convert(e)))
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(MARKDOWN_EXTENSION))
}

/// The ordered result of a [`Parser::parse_posts`] run: the posts that were
/// assembled, plus a record of every document that wasn't.
#[derive(Debug)]
pub struct Posts {
    posts: Vec<Post>,
    failures: Vec<DocumentError>,
    discovered: usize,
}

impl Posts {
    /// Sorts `posts` by date, most recent first, and freezes the result.
    /// Dates are compared as plain strings and the sort is stable, so posts
    /// with equal dates keep their relative order.
    pub fn new(mut posts: Vec<Post>, failures: Vec<DocumentError>, discovered: usize) -> Posts {
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        Posts {
            posts,
            failures,
            discovered,
        }
    }

    /// The posts, most recent first.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// The documents that were skipped.
    pub fn failures(&self) -> &[DocumentError] {
        &self.failures
    }

    /// The number of markdown files found, including those that failed.
    /// Unreadable entries that aren't markdown files aren't counted.
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Returns every slug shared by more than one post, with the posts that
    /// share it, ordered by slug. These posts overwrite each other's output
    /// file; nothing here renames them.
    pub fn slug_collisions(&self) -> Vec<(&str, Vec<&Post>)> {
        let mut by_slug: BTreeMap<&str, Vec<&Post>> = BTreeMap::new();
        for post in self.posts.iter() {
            by_slug.entry(&post.slug).or_default().push(post);
        }
        by_slug
            .into_iter()
            .filter(|(_, posts)| posts.len() > 1)
            .collect()
    }

    /// Consumes the collection, returning the failures.
    pub fn into_failures(self) -> Vec<DocumentError> {
        self.failures
    }
}

/// A document that was skipped, with the reason.
#[derive(Debug)]
pub struct DocumentError {
    pub path: PathBuf,
    pub cause: Cause,
}

/// Why a document was skipped.
#[derive(Debug)]
pub enum Cause {
    /// The file couldn't be read or wasn't valid UTF-8.
    Read(io::Error),

    /// The directory entry couldn't be inspected (e.g., a dangling symlink).
    Walk(walkdir::Error),

    /// The markdown converter failed on the body.
    Convert(markdown::Error),
}

impl fmt::Display for DocumentError {
    /// Displays a [`DocumentError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "parsing post `{}`: {}", self.path.display(), self.cause)
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cause::Read(err) => write!(f, "reading file: {}", err),
            Cause::Walk(err) => err.fmt(f),
            Cause::Convert(err) => write!(f, "converting markdown: {}", err),
        }
    }
}

impl std::error::Error for Cause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Cause::Read(err) => Some(err),
            Cause::Walk(err) => Some(err),
            Cause::Convert(err) => Some(err),
        }
    }
}

/// Represents the result of a [`Parser::parse_posts`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a fatal error discovering posts.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source directory doesn't exist or isn't a
    /// directory.
    SourceUnavailable(PathBuf),

    /// Returned when the source directory can't be listed.
    Walk(walkdir::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::SourceUnavailable(path) => {
                write!(f, "source directory `{}` does not exist", path.display())
            }
            Error::Walk(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceUnavailable(_) => None,
            Error::Walk(err) => Some(err),
        }
    }
}
