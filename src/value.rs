//! Conversions from posts and site metadata into template [`Value`]s.

use crate::post::Post;
use crate::render::{Site, Summary};
use gtmpl::Value;
use std::collections::{BTreeSet, HashMap};

fn string(s: &str) -> Value {
    Value::String(s.to_owned())
}

fn strings(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| string(s)).collect())
}

impl From<&Post> for Value {
    /// Converts a [`Post`] into a [`Value::Object`] with fields `title`,
    /// `date`, `author`, `tags`, `slug`, `content`, `source_name`, and
    /// `extra`.
    fn from(post: &Post) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), string(&post.title));
        m.insert("date".to_owned(), string(&post.date));
        m.insert("author".to_owned(), string(&post.author));
        m.insert("tags".to_owned(), strings(&post.tags));
        m.insert("slug".to_owned(), string(&post.slug));
        m.insert("content".to_owned(), string(&post.content));
        m.insert("source_name".to_owned(), string(&post.source_name));
        m.insert(
            "extra".to_owned(),
            Value::Object(
                post.extra
                    .iter()
                    .map(|(k, v)| (k.clone(), string(v)))
                    .collect(),
            ),
        );
        Value::Object(m)
    }
}

impl From<&Summary<'_>> for Value {
    /// Converts a [`Summary`] into the post's [`Value`] plus `url` and
    /// `excerpt` fields.
    fn from(summary: &Summary) -> Value {
        let mut value = Value::from(summary.post);
        if let Value::Object(m) = &mut value {
            m.insert("url".to_owned(), string(&summary.url));
            m.insert("excerpt".to_owned(), string(&summary.excerpt));
        }
        value
    }
}

/// Gives the `extra` object of a post [`Value`] an empty string for each of
/// `keys` it doesn't set, so templates can name any post's extra key.
pub(crate) fn fill_extra(value: &mut Value, keys: &BTreeSet<&str>) {
    if let Value::Object(m) = value {
        if let Some(Value::Object(extra)) = m.get_mut("extra") {
            for key in keys {
                extra
                    .entry((*key).to_owned())
                    .or_insert_with(|| string(""));
            }
        }
    }
}

impl From<&Site> for Value {
    fn from(site: &Site) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), string(&site.title));
        m.insert("tagline".to_owned(), string(&site.tagline));
        Value::Object(m)
    }
}
