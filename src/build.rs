//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts
//! ([`crate::parser`]), rendering index and post pages ([`crate::render`]), and
//! writing the pages and the stylesheet to disk ([`crate::write`]).

use crate::config::{Config, Theme};
use crate::markdown::{Converter, Markdown};
use crate::parser::{DocumentError, Error as ParseError, Parser as PostParser};
use crate::render::{
    Error as RenderError, RenderFailure, Renderer, DEFAULT_INDEX_TEMPLATE,
    DEFAULT_POST_TEMPLATE, DEFAULT_STYLESHEET,
};
use crate::write::{WriteFailure, Writer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a completed build did. Per-document and per-file failures are
/// reported here rather than as errors.
#[derive(Debug)]
pub struct Report {
    /// The number of posts rendered.
    pub posts: usize,

    /// Documents that were skipped.
    pub document_failures: Vec<DocumentError>,

    /// Posts whose page template failed. They're left out of the index.
    pub render_failures: Vec<RenderFailure>,

    /// Output files that couldn't be written.
    pub write_failures: Vec<WriteFailure>,
}

impl fmt::Display for Report {
    /// A one-line summary with failure counts. The failures themselves are
    /// logged as they happen.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Generated {} posts", self.posts)?;
        let failed = [
            (self.document_failures.len(), "skipped"),
            (self.render_failures.len(), "failed to render"),
            (self.write_failures.len(), "failed to write"),
        ];
        let counts: Vec<String> = failed
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, what)| format!("{} {}", n, what))
            .collect();
        if !counts.is_empty() {
            write!(f, " ({})", counts.join(", "))?;
        }
        Ok(())
    }
}

/// Builds the site from a [`Config`] object, converting post bodies with the
/// pulldown-cmark [`Markdown`] converter.
pub fn build_site(config: &Config) -> Result<Report> {
    build_site_with(config, &Markdown::new())
}

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`Renderer::render`], and
/// [`Writer::write_all`] which do the heavy-lifting.
///
/// Nothing is written if no post survives parsing and rendering.
pub fn build_site_with(config: &Config, converter: &dyn Converter) -> Result<Report> {
    // collect all posts
    let posts = PostParser::new(converter).parse_posts(&config.source_directory)?;
    if posts.is_empty() {
        return Err(Error::EmptyCorpus {
            discovered: posts.discovered(),
            failures: posts.into_failures(),
        });
    }
    for (slug, colliding) in posts.slug_collisions() {
        let sources: Vec<&str> = colliding.iter().map(|p| p.source_name.as_str()).collect();
        warn!(
            "{} posts share the slug `{}` and will overwrite each other: {}",
            colliding.len(),
            slug,
            sources.join(", ")
        );
    }

    // load the theme and render every page before touching the output
    let theme = load_theme(&config.theme)?;
    let renderer = Renderer::new(
        &theme.index_template,
        &theme.post_template,
        config.site.clone(),
    )?;
    let rendered = renderer.render(posts.posts())?;
    if rendered.pages.is_empty() {
        return Err(Error::NothingRendered(rendered.failures));
    }
    let written = posts.len() - rendered.failures.len();

    std::fs::create_dir_all(&config.output_directory).map_err(|err| {
        Error::CreateOutputDirectory {
            path: config.output_directory.clone(),
            err,
        }
    })?;
    let writer = Writer {
        output_directory: &config.output_directory,
    };
    let write_failures = writer.write_all(&rendered.pages, &theme.stylesheet);

    info!(
        "generated {} posts in `{}`",
        written,
        config.output_directory.display()
    );
    Ok(Report {
        posts: written,
        document_failures: posts.into_failures(),
        render_failures: rendered.failures,
        write_failures,
    })
}

struct LoadedTheme {
    index_template: String,
    post_template: String,
    stylesheet: String,
}

// Reads each override file, falling back to the built-in theme.
fn load_theme(theme: &Theme) -> Result<LoadedTheme> {
    fn load(path: &Option<PathBuf>, default: &str) -> Result<String> {
        match path {
            None => Ok(default.to_owned()),
            Some(path) => read_theme_file(path),
        }
    }

    Ok(LoadedTheme {
        index_template: load(&theme.index_template, DEFAULT_INDEX_TEMPLATE)?,
        post_template: load(&theme.post_template, DEFAULT_POST_TEMPLATE)?,
        stylesheet: load(&theme.stylesheet, DEFAULT_STYLESHEET)?,
    })
}

fn read_theme_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::OpenThemeFile {
        path: path.to_owned(),
        err: e,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing,
/// loading theme files, rendering, and creating the output directory.
#[derive(Debug)]
pub enum Error {
    /// Returned when the source directory is missing or unreadable.
    Parse(ParseError),

    /// Returned when no post survived parsing. Nothing was written.
    EmptyCorpus {
        discovered: usize,
        failures: Vec<DocumentError>,
    },

    /// Returned for I/O problems while opening theme files.
    OpenThemeFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing templates or executing the index
    /// template.
    Render(RenderError),

    /// Returned when every post's page template failed. Nothing was
    /// written.
    NothingRendered(Vec<RenderFailure>),

    /// Returned when the output root can't be created.
    CreateOutputDirectory { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::EmptyCorpus {
                discovered: 0,
                failures: _,
            } => write!(f, "no markdown files found"),
            Error::EmptyCorpus {
                discovered,
                failures,
            } => write!(
                f,
                "no posts to generate: all {} markdown files failed ({} reported)",
                discovered,
                failures.len()
            ),
            Error::OpenThemeFile { path, err } => {
                write!(f, "Opening theme file '{}': {}", path.display(), err)
            }
            Error::Render(err) => err.fmt(f),
            Error::NothingRendered(failures) => write!(
                f,
                "no posts to generate: all {} post pages failed to render",
                failures.len()
            ),
            Error::CreateOutputDirectory { path, err } => {
                write!(f, "Creating output directory '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::EmptyCorpus { .. } => None,
            Error::OpenThemeFile { path: _, err } => Some(err),
            Error::Render(err) => Some(err),
            Error::NothingRendered(failures) => failures
                .first()
                .map(|failure| failure as &(dyn std::error::Error + 'static)),
            Error::CreateOutputDirectory { path: _, err } => Some(err),
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<RenderError> for Error {
    /// Converts [`RenderError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: RenderError) -> Error {
        Error::Render(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown;
    use crate::render::Site;
    use std::fs;

    struct Picky;

    impl Converter for Picky {
        fn to_html(&self, body: &str) -> markdown::Result<String> {
            if body.contains("FAIL") {
                Err(markdown::Error::Rejected("contains FAIL".to_owned()))
            } else {
                Markdown::new().to_html(body)
            }
        }
    }

    fn config(source: &Path, output: &Path) -> Config {
        Config {
            source_directory: source.to_owned(),
            output_directory: output.to_owned(),
            site: Site {
                title: "Test Blog".to_owned(),
                tagline: "Testing".to_owned(),
            },
            theme: Theme::default(),
        }
    }

    #[test]
    fn test_build_site() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let output_root = output.path().join("site");
        fs::write(
            source.path().join("one.md"),
            "---\ntitle: First Post\ndate: 2024-01-01\n---\nHello",
        )
        .unwrap();
        fs::write(
            source.path().join("two.md"),
            "---\ntitle: Second Post\ndate: 2024-03-01\n---\nWorld",
        )
        .unwrap();
        fs::write(
            source.path().join("three.md"),
            "---\ntitle: Broken\ndate: 2024-02-01\n---\nFAIL",
        )
        .unwrap();

        let report = build_site_with(&config(source.path(), &output_root), &Picky).unwrap();
        assert_eq!(2, report.posts);
        assert_eq!(1, report.document_failures.len());
        assert_eq!(source.path().join("three.md"), report.document_failures[0].path);
        assert!(report.render_failures.is_empty());
        assert!(report.write_failures.is_empty());
        assert_eq!("Generated 2 posts (1 skipped)", report.to_string());

        let index = fs::read_to_string(output_root.join("index.html")).unwrap();
        assert!(index.find("Second Post") < index.find("First Post"), "{}", index);
        assert!(!index.contains("Broken"));
        assert!(output_root.join("posts/first-post.html").is_file());
        assert!(output_root.join("posts/second-post.html").is_file());
        assert!(!output_root.join("posts/broken.html").exists());
        assert_eq!(
            DEFAULT_STYLESHEET,
            fs::read_to_string(output_root.join("styles.css")).unwrap()
        );
    }

    #[test]
    fn test_empty_corpus_writes_nothing() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let output_root = output.path().join("site");

        match build_site(&config(source.path(), &output_root)) {
            Err(Error::EmptyCorpus {
                discovered: 0,
                failures,
            }) => assert!(failures.is_empty()),
            other => panic!("expected EmptyCorpus, got {:?}", other),
        }
        assert!(!output_root.exists());
    }

    #[test]
    fn test_all_documents_failing_is_an_empty_corpus() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.md"), "FAIL").unwrap();

        match build_site_with(&config(source.path(), output.path()), &Picky) {
            Err(Error::EmptyCorpus {
                discovered: 1,
                failures,
            }) => assert_eq!(1, failures.len()),
            other => panic!("expected EmptyCorpus, got {:?}", other),
        }
        assert!(!output.path().join("index.html").exists());
    }

    #[test]
    fn test_missing_source_directory() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("nope");
        match build_site(&config(&missing, output.path())) {
            Err(Error::Parse(ParseError::SourceUnavailable(path))) => assert_eq!(missing, path),
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_theme_override() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.md"), "---\ntitle: Only\n---\nx").unwrap();
        let theme_file = source.path().join("index.tmpl");
        fs::write(&theme_file, "{{ range .posts }}{{ .title }};{{ end }}").unwrap();

        let mut config = config(source.path(), output.path());
        config.theme.index_template = Some(theme_file);
        build_site(&config).unwrap();
        assert_eq!(
            "Only;",
            fs::read_to_string(output.path().join("index.html")).unwrap()
        );
    }

    #[test]
    fn test_extra_key_used_by_template() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            source.path().join("a.md"),
            "---\ntitle: A\ndate: 2024-01-02\nlayout: wide\n---\nx",
        )
        .unwrap();
        fs::write(
            source.path().join("b.md"),
            "---\ntitle: B\ndate: 2024-01-01\n---\ny",
        )
        .unwrap();
        let theme_file = source.path().join("post.tmpl");
        fs::write(&theme_file, "<{{ .post.extra.layout }}>").unwrap();

        let mut config = config(source.path(), output.path());
        config.theme.post_template = Some(theme_file);
        let report = build_site(&config).unwrap();
        assert_eq!(2, report.posts);
        assert!(report.render_failures.is_empty());
        assert_eq!(
            "<wide>",
            fs::read_to_string(output.path().join("posts/a.html")).unwrap()
        );
        assert_eq!(
            "<>",
            fs::read_to_string(output.path().join("posts/b.html")).unwrap()
        );
    }

    #[test]
    fn test_failed_post_pages_are_skipped() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let output_root = output.path().join("site");
        fs::write(source.path().join("a.md"), "---\ntitle: A\n---\nx").unwrap();
        fs::write(source.path().join("b.md"), "---\ntitle: B\n---\ny").unwrap();
        let theme_file = source.path().join("post.tmpl");
        fs::write(
            &theme_file,
            "{{ if eq .post.slug \"b\" }}{{ .post.missing }}{{ end }}ok",
        )
        .unwrap();

        let mut config = config(source.path(), &output_root);
        config.theme.post_template = Some(theme_file.clone());
        let report = build_site(&config).unwrap();
        assert_eq!(1, report.posts);
        assert_eq!(1, report.render_failures.len());
        assert_eq!("b", report.render_failures[0].source_name);
        assert!(output_root.join("posts/a.html").is_file());
        assert!(!output_root.join("posts/b.html").exists());
        let index = fs::read_to_string(output_root.join("index.html")).unwrap();
        assert!(!index.contains("posts/b.html"), "{}", index);
        assert_eq!(
            "Generated 1 posts (1 failed to render)",
            report.to_string()
        );

        fs::write(&theme_file, "{{ .post.missing }}").unwrap();
        let empty_root = output.path().join("empty");
        let mut config = config.clone();
        config.output_directory = empty_root.clone();
        match build_site(&config) {
            Err(Error::NothingRendered(failures)) => assert_eq!(2, failures.len()),
            other => panic!("expected NothingRendered, got {:?}", other),
        }
        assert!(!empty_root.exists());
    }

    #[test]
    fn test_missing_theme_file() {
        let source = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(source.path().join("a.md"), "x").unwrap();

        let mut config = config(source.path(), output.path());
        config.theme.stylesheet = Some(source.path().join("missing.css"));
        assert!(matches!(
            build_site(&config),
            Err(Error::OpenThemeFile { .. })
        ));
    }
}
