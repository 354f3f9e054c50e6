//! Derives URL-safe identifiers from post titles.

/// Converts `title` into a slug: lower-case letters, digits, and underscores
/// separated by single hyphens. Every other character is dropped, and runs
/// of whitespace and hyphens collapse into one hyphen. Leading and trailing
/// hyphens are removed, so a title with no word characters yields an empty
/// slug.
///
/// No uniqueness check happens here; two titles may share a slug (see
/// [`crate::parser::Posts::slug_collisions`]).
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
    }
    slug
}
