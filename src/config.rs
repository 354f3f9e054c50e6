//! Loads build configuration from an optional `blog.yaml` project file.
//!
//! ```yaml
//! title: My Blog
//! tagline: Welcome to my personal blog
//! source_directory: posts
//! output_directory: output
//! theme:
//!   index_template: theme/index.html
//!   post_template: theme/post.html
//!   stylesheet: theme/styles.css
//! ```
//!
//! Every field is optional. Relative paths are resolved against the
//! directory containing the project file.

use crate::render::Site;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "blog.yaml";

pub const DEFAULT_TITLE: &str = "My Blog";
pub const DEFAULT_TAGLINE: &str = "Welcome to my personal blog";
pub const DEFAULT_SOURCE_DIRECTORY: &str = "posts";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    title: Option<String>,
    tagline: Option<String>,
    source_directory: Option<PathBuf>,
    output_directory: Option<PathBuf>,

    #[serde(default)]
    theme: Theme,
}

/// Files that replace the built-in templates and stylesheet. `None` keeps
/// the built-in.
#[derive(Deserialize, Default, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Theme {
    pub index_template: Option<PathBuf>,
    pub post_template: Option<PathBuf>,
    pub stylesheet: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub site: Site,
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            source_directory: PathBuf::from(DEFAULT_SOURCE_DIRECTORY),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            site: Site {
                title: DEFAULT_TITLE.to_owned(),
                tagline: DEFAULT_TAGLINE.to_owned(),
            },
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// Looks for [`PROJECT_FILE`] in `dir` and then in each of its ancestors,
    /// loading the first one found. Without a project file, the defaults are
    /// used.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path)
                    .with_context(|| format!("Loading configuration from `{}`", path.display()));
            }
        }
        debug!(
            "no `{}` found from `{}` upward; using defaults",
            PROJECT_FILE,
            dir.display()
        );
        Ok(Config::default())
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let file = File::open(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = serde_yaml::from_reader(file)
            .with_context(|| format!("Parsing project file `{}`", path.display()))?;
        let root = match path.parent() {
            None => {
                return Err(anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                ))
            }
            Some(root) => root,
        };
        let resolve = |relpath: PathBuf| root.join(relpath);

        let defaults = Config::default();
        Ok(Config {
            source_directory: resolve(
                project
                    .source_directory
                    .unwrap_or(defaults.source_directory),
            ),
            output_directory: resolve(
                project
                    .output_directory
                    .unwrap_or(defaults.output_directory),
            ),
            site: Site {
                title: project.title.unwrap_or(defaults.site.title),
                tagline: project.tagline.unwrap_or(defaults.site.tagline),
            },
            theme: Theme {
                index_template: project.theme.index_template.map(resolve),
                post_template: project.theme.post_template.map(resolve),
                stylesheet: project.theme.stylesheet.map(resolve),
            },
        })
    }

    /// Replaces the source and output directories with any that were given
    /// explicitly.
    pub fn with_overrides(
        mut self,
        source_directory: Option<PathBuf>,
        output_directory: Option<PathBuf>,
    ) -> Config {
        if let Some(dir) = source_directory {
            self.source_directory = dir;
        }
        if let Some(dir) = output_directory {
            self.output_directory = dir;
        }
        self
    }
}
