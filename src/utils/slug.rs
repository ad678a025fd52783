/// Derive a URL-safe slug from a display name.
///
/// Lowercases, turns whitespace and punctuation runs into single hyphens,
/// and strips leading/trailing hyphens. Applying it to its own output is a
/// no-op, so stored slugs can be re-derived safely.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // swallow leading separators

    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_to_hyphen() {
        assert_eq!(slugify("Travel Tips"), "travel-tips");
    }

    #[test]
    fn idempotent() {
        let once = slugify("Travel Tips");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("Rust  &  Go"), "rust-go");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slugify("  hello world!  "), "hello-world");
    }

    #[test]
    fn unicode_names_survive() {
        assert_eq!(slugify("일상 기록"), "일상-기록");
    }

    #[test]
    fn symbols_only_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }
}
