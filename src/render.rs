//! Projects a sorted slice of [`Post`]s into rendered [`Page`]s: one index
//! page listing every post, and one page per post. Templating is done by
//! [`gtmpl`]; this module decides what each template gets to see.
//!
//! The index template receives:
//!
//! * `site`: the [`Site`] title and tagline
//! * `stylesheet`: the relative URL of the stylesheet
//! * `posts`: every post in order, each with the post fields plus `url` and
//!   `excerpt`
//!
//! The post template receives `site`, `stylesheet`, `post` (the post fields),
//! and `back` (the relative URL of the index page).
//!
//! Every post's `extra` map carries the union of the extra keys across all
//! posts; a key a post doesn't set is an empty string.

use crate::post::Post;
use crate::value::fill_extra;
use gtmpl::{Context, Template, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The built-in index page template.
pub const DEFAULT_INDEX_TEMPLATE: &str = include_str!("../theme/index.html");

/// The built-in post page template.
pub const DEFAULT_POST_TEMPLATE: &str = include_str!("../theme/post.html");

/// The built-in stylesheet.
pub const DEFAULT_STYLESHEET: &str = include_str!("../theme/styles.css");

pub const INDEX_FILE: &str = "index.html";
pub const POSTS_DIRECTORY: &str = "posts";
pub const STYLESHEET_FILE: &str = "styles.css";

/// The number of raw HTML characters the index excerpt is cut from.
pub const EXCERPT_LENGTH: usize = 200;

/// Site-wide values available to both templates.
#[derive(Clone, Debug)]
pub struct Site {
    pub title: String,
    pub tagline: String,
}

/// A rendered output file. `path` is relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub path: PathBuf,
    pub contents: String,
}

/// A post as it appears in the index: the post itself, the link to its page,
/// and a short excerpt.
pub struct Summary<'a> {
    pub post: &'a Post,
    pub url: String,
    pub excerpt: String,
}

impl<'a> Summary<'a> {
    pub fn new(post: &'a Post) -> Summary<'a> {
        Summary {
            post,
            url: format!("{}/{}.html", POSTS_DIRECTORY, post.slug),
            excerpt: excerpt(&post.content),
        }
    }
}

/// The pages produced by [`Renderer::render`], and the posts whose page
/// couldn't be rendered.
#[derive(Debug)]
pub struct Rendered {
    /// The index page followed by the post pages, in post order. Empty when
    /// no post page rendered.
    pub pages: Vec<Page>,
    pub failures: Vec<RenderFailure>,
}

/// A post whose page template failed. The post is left out of the index.
#[derive(Debug)]
pub struct RenderFailure {
    pub source_name: String,
    pub err: Error,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rendering post `{}`: {}", self.source_name, self.err)
    }
}

impl std::error::Error for RenderFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

/// Renders pages from parsed templates.
pub struct Renderer {
    index_template: Template,
    post_template: Template,
    site: Site,
}

impl Renderer {
    /// Parses the index and post template sources.
    pub fn new(index_template: &str, post_template: &str, site: Site) -> Result<Renderer> {
        Ok(Renderer {
            index_template: parse_template("index", index_template)?,
            post_template: parse_template("post", post_template)?,
            site,
        })
    }

    /// Renders one page per post, then the index page over the posts whose
    /// page rendered. A post whose page fails is recorded in
    /// [`Rendered::failures`] and left out of the index; the other posts
    /// still render. Only an index failure is an error.
    pub fn render(&self, posts: &[Post]) -> Result<Rendered> {
        let keys = extra_keys(posts);
        let mut rendered = Vec::with_capacity(posts.len());
        let mut post_pages = Vec::with_capacity(posts.len());
        let mut failures = Vec::new();
        for post in posts {
            match self.render_post(post, &keys) {
                Ok(page) => {
                    rendered.push(post);
                    post_pages.push(page);
                }
                Err(err) => {
                    let failure = RenderFailure {
                        source_name: post.source_name.clone(),
                        err,
                    };
                    warn!("{}", failure);
                    failures.push(failure);
                }
            }
        }
        if rendered.is_empty() {
            return Ok(Rendered {
                pages: Vec::new(),
                failures,
            });
        }

        let mut pages = Vec::with_capacity(post_pages.len() + 1);
        pages.push(self.render_index(&rendered, &keys)?);
        pages.extend(post_pages);
        Ok(Rendered { pages, failures })
    }

    fn render_index(&self, posts: &[&Post], keys: &BTreeSet<&str>) -> Result<Page> {
        let context = index_context(posts, &self.site, keys);
        execute(&self.index_template, context)
            .map(|contents| Page {
                path: PathBuf::from(INDEX_FILE),
                contents,
            })
            .map_err(|err| Error::Annotated("rendering index".to_owned(), Box::new(err)))
    }

    fn render_post(&self, post: &Post, keys: &BTreeSet<&str>) -> Result<Page> {
        let contents = execute(&self.post_template, post_context(post, &self.site, keys))?;
        Ok(Page {
            path: post_path(post),
            contents,
        })
    }
}

/// Every `extra` key set by at least one of `posts`.
pub fn extra_keys(posts: &[Post]) -> BTreeSet<&str> {
    posts
        .iter()
        .flat_map(|post| post.extra.keys().map(String::as_str))
        .collect()
}

/// The output path of a post's page, relative to the output root.
pub fn post_path(post: &Post) -> PathBuf {
    Path::new(POSTS_DIRECTORY).join(format!("{}.html", post.slug))
}

/// Builds the index template input.
pub fn index_context(posts: &[&Post], site: &Site, keys: &BTreeSet<&str>) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("site".to_owned(), Value::from(site));
    m.insert(
        "stylesheet".to_owned(),
        Value::String(STYLESHEET_FILE.to_owned()),
    );
    m.insert(
        "posts".to_owned(),
        Value::Array(
            posts
                .iter()
                .map(|p| {
                    let mut value = Value::from(&Summary::new(p));
                    fill_extra(&mut value, keys);
                    value
                })
                .collect(),
        ),
    );
    Value::Object(m)
}

/// Builds the post template input.
pub fn post_context(post: &Post, site: &Site, keys: &BTreeSet<&str>) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("site".to_owned(), Value::from(site));
    m.insert(
        "stylesheet".to_owned(),
        Value::String(format!("../{}", STYLESHEET_FILE)),
    );
    m.insert("back".to_owned(), Value::String(format!("../{}", INDEX_FILE)));
    let mut value = Value::from(post);
    fill_extra(&mut value, keys);
    m.insert("post".to_owned(), value);
    Value::Object(m)
}

/// Cuts the first [`EXCERPT_LENGTH`] characters from `html` and strips the
/// markup from them. The cut counts raw HTML characters, so it can land
/// inside a tag or a word; a tag left unterminated by the cut is dropped.
pub fn excerpt(html: &str) -> String {
    let prefix = match html.char_indices().nth(EXCERPT_LENGTH) {
        Some((i, _)) => &html[..i],
        None => html,
    };
    strip_tags(prefix)
}

// Removes comments and tags, then collapses whitespace runs to single spaces.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let tag = &rest[start..];
        let end = if tag.starts_with("<!--") {
            tag.find("-->").map(|i| i + "-->".len())
        } else {
            tag.find('>').map(|i| i + 1)
        };
        match end {
            Some(end) => rest = &tag[end..],
            None => {
                rest = "";
                break;
            }
        }
    }
    text.push_str(rest);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_template(name: &str, source: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(source)
        .map_err(|err| Error::ParseTemplate {
            name: name.to_owned(),
            err: err.to_string(),
        })?;
    Ok(template)
}

fn execute(template: &Template, value: Value) -> Result<String> {
    let context = Context::from(value).map_err(|err| Error::Template(err.to_string()))?;
    let mut out: Vec<u8> = Vec::new();
    template
        .execute(&mut out, &context)
        .map_err(|err| Error::Template(err.to_string()))?;
    Ok(String::from_utf8(out)?)
}

/// The result of a fallible rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a rendering operation.
#[derive(Debug)]
pub enum Error {
    /// Returned when a template source doesn't parse.
    ParseTemplate { name: String, err: String },

    /// Returned for errors while executing a template.
    Template(String),

    /// Returned when a template produces bytes that aren't UTF-8.
    Encoding(std::string::FromUtf8Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseTemplate { name, err } => {
                write!(f, "parsing {} template: {}", name, err)
            }
            Error::Template(err) => err.fmt(f),
            Error::Encoding(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ParseTemplate { .. } => None,
            Error::Template(_) => None,
            Error::Encoding(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Encoding(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn site() -> Site {
        Site {
            title: "Test Blog".to_owned(),
            tagline: "Words".to_owned(),
        }
    }

    fn post(title: &str, slug: &str, content: &str) -> Post {
        Post {
            title: title.to_owned(),
            date: "2024-01-01".to_owned(),
            author: "Ada".to_owned(),
            tags: vec!["rust".to_owned(), "web".to_owned()],
            slug: slug.to_owned(),
            content: content.to_owned(),
            source_name: slug.to_owned(),
            extra: BTreeMap::new(),
        }
    }

    fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
        match value {
            Value::Object(m) => &m[key],
            _ => panic!("not an object: {:?}", value),
        }
    }

    fn as_str(value: &Value) -> &str {
        match value {
            Value::String(s) => s,
            _ => panic!("not a string: {:?}", value),
        }
    }

    #[test]
    fn test_excerpt_short_body() {
        assert_eq!(
            "Hello world and friends",
            excerpt("<p>Hello <em>world</em></p>\n<p>and friends</p>\n")
        );
    }

    #[test]
    fn test_excerpt_truncates_raw_characters() {
        let html = format!("<p>{}</p>", "word ".repeat(100));
        let excerpt = excerpt(&html);
        assert!(excerpt.chars().count() <= EXCERPT_LENGTH);
        assert!(excerpt.starts_with("word word"));
        assert!(!excerpt.contains('<'));
    }

    #[test]
    fn test_excerpt_cut_inside_tag() {
        let html = format!("{}<a href=\"https://example.com\">link</a>", "x".repeat(190));
        assert_eq!("x".repeat(190), excerpt(&html));
    }

    #[test]
    fn test_excerpt_counts_characters_not_bytes() {
        let html = "é".repeat(250);
        assert_eq!("é".repeat(EXCERPT_LENGTH), excerpt(&html));
    }

    #[test]
    fn test_strip_tags_comments() {
        assert_eq!("a b", strip_tags("a<!-- <p>hidden</p> --> <br/>b"));
    }

    #[test]
    fn test_index_context() {
        let posts = vec![
            post("First", "first", "<p>One</p>"),
            post("Second", "second", "<p>Two</p>"),
        ];
        let refs: Vec<&Post> = posts.iter().collect();
        let value = index_context(&refs, &site(), &extra_keys(&posts));

        assert_eq!("styles.css", as_str(field(&value, "stylesheet")));
        assert_eq!("Test Blog", as_str(field(field(&value, "site"), "title")));
        match field(&value, "posts") {
            Value::Array(items) => {
                assert_eq!(2, items.len());
                assert_eq!("First", as_str(field(&items[0], "title")));
                assert_eq!("posts/first.html", as_str(field(&items[0], "url")));
                assert_eq!("One", as_str(field(&items[0], "excerpt")));
                assert_eq!("Second", as_str(field(&items[1], "title")));
            }
            other => panic!("posts is not an array: {:?}", other),
        }
    }

    #[test]
    fn test_post_context() {
        let first = post("First", "first", "<p>One</p>");
        let value = post_context(&first, &site(), &BTreeSet::new());
        assert_eq!("../index.html", as_str(field(&value, "back")));
        assert_eq!("../styles.css", as_str(field(&value, "stylesheet")));
        let post = field(&value, "post");
        assert_eq!("<p>One</p>", as_str(field(post, "content")));
        match field(post, "tags") {
            Value::Array(tags) => assert_eq!(2, tags.len()),
            other => panic!("tags is not an array: {:?}", other),
        }
    }

    #[test]
    fn test_render_default_theme() {
        let renderer =
            Renderer::new(DEFAULT_INDEX_TEMPLATE, DEFAULT_POST_TEMPLATE, site()).unwrap();
        let posts = vec![
            post("First", "first", "<p>One</p>"),
            post("Second", "second", "<p>Two</p>"),
        ];
        let rendered = renderer.render(&posts).unwrap();
        assert!(rendered.failures.is_empty());
        let pages = rendered.pages;

        assert_eq!(
            vec![
                PathBuf::from("index.html"),
                PathBuf::from("posts/first.html"),
                PathBuf::from("posts/second.html"),
            ],
            pages.iter().map(|p| p.path.clone()).collect::<Vec<_>>()
        );

        let index = &pages[0].contents;
        assert!(index.contains("<title>Test Blog</title>"), "{}", index);
        assert!(index.contains(r#"<a href="posts/first.html">First</a>"#), "{}", index);
        assert!(index.find("First") < index.find("Second"), "{}", index);
        assert!(index.contains(r#"<span class="tag">rust</span>"#), "{}", index);

        let first = &pages[1].contents;
        assert!(first.contains("<p>One</p>"), "{}", first);
        assert!(first.contains(r#"href="../index.html""#), "{}", first);
        assert!(first.contains(r#"href="../styles.css""#), "{}", first);
    }

    #[test]
    fn test_render_custom_template() {
        let renderer = Renderer::new(
            "{{ range .posts }}[{{ .slug }}]{{ end }}",
            "{{ .post.title }} by {{ .post.author }}",
            site(),
        )
        .unwrap();
        let posts = vec![post("A", "a", ""), post("B", "b", "")];
        let pages = renderer.render(&posts).unwrap().pages;
        assert_eq!("[a][b]", pages[0].contents);
        assert_eq!("A by Ada", pages[1].contents);
    }

    #[test]
    fn test_extra_keys_missing_from_a_post_are_empty() {
        let renderer = Renderer::new(
            "{{ range .posts }}[{{ .extra.layout }}]{{ end }}",
            "<{{ .post.extra.layout }}>",
            site(),
        )
        .unwrap();
        let mut wide = post("Wide", "wide", "");
        wide.extra.insert("layout".to_owned(), "wide".to_owned());
        let posts = vec![wide, post("Plain", "plain", "")];

        let rendered = renderer.render(&posts).unwrap();
        assert!(rendered.failures.is_empty());
        assert_eq!(
            vec!["[wide][]", "<wide>", "<>"],
            rendered
                .pages
                .iter()
                .map(|p| p.contents.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_failed_post_page_is_skipped() {
        let renderer = Renderer::new(
            "{{ range .posts }}[{{ .slug }}]{{ end }}",
            "{{ .post.missing }}",
            site(),
        )
        .unwrap();
        let posts = vec![post("A", "a", "")];
        let rendered = renderer.render(&posts).unwrap();
        assert!(rendered.pages.is_empty());
        assert_eq!(1, rendered.failures.len());
        assert_eq!("a", rendered.failures[0].source_name);
    }

    #[test]
    fn test_failed_post_is_left_out_of_the_index() {
        let renderer = Renderer::new(
            "{{ range .posts }}[{{ .slug }}]{{ end }}",
            "{{ if eq .post.slug \"b\" }}{{ .post.missing }}{{ end }}ok",
            site(),
        )
        .unwrap();
        let posts = vec![post("A", "a", ""), post("B", "b", ""), post("C", "c", "")];

        let rendered = renderer.render(&posts).unwrap();
        assert_eq!(1, rendered.failures.len());
        assert_eq!("b", rendered.failures[0].source_name);
        assert_eq!(
            vec![
                PathBuf::from("index.html"),
                PathBuf::from("posts/a.html"),
                PathBuf::from("posts/c.html"),
            ],
            rendered
                .pages
                .iter()
                .map(|p| p.path.clone())
                .collect::<Vec<_>>()
        );
        assert_eq!("[a][c]", rendered.pages[0].contents);
    }

    #[test]
    fn test_parse_template_error() {
        match Renderer::new("{{ range .posts }}", "", site()) {
            Err(Error::ParseTemplate { name, .. }) => assert_eq!("index", name),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected a parse error"),
        }
    }
}
