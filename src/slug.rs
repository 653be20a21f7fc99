//! File-name normalization for screenshot outputs

/// Longest slug produced by [`slugify`]
pub const MAX_SLUG_LEN: usize = 120;

/// Name used when an id normalizes to nothing
pub const FALLBACK_NAME: &str = "example";

fn is_slug_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-')
}

/// Normalize an identifier into a file-name-safe slug.
///
/// Lowercases, replaces each run of characters outside `[a-z0-9_-]` with a
/// single `-`, trims edge hyphens and caps the length at [`MAX_SLUG_LEN`].
/// May return an empty string.
pub fn slugify(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut in_run = false;

    for c in lower.chars() {
        if is_slug_char(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }

    // Output is ASCII, so byte truncation is character truncation.
    let trimmed = out.trim_matches('-');
    let capped = &trimmed[..trimmed.len().min(MAX_SLUG_LEN)];
    capped.trim_end_matches('-').to_string()
}

/// Screenshot file stem for a target id, never empty.
pub fn screenshot_name(id: &str) -> String {
    let slug = slugify(id);
    if slug.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_collapses_to_single_hyphen() {
        assert_eq!(slugify("Foo Bar!"), "foo-bar");
        assert_eq!(slugify("a  &&  b"), "a-b");
    }

    #[test]
    fn allowed_characters_are_kept() {
        assert_eq!(slugify("tower_defense"), "tower_defense");
        assert_eq!(slugify("perlin-2"), "perlin-2");
        // existing hyphen runs are not part of a disallowed run
        assert_eq!(slugify("a--b"), "a--b");
    }

    #[test]
    fn edges_are_trimmed() {
        assert_eq!(slugify("  --Hello--  "), "hello");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn non_ascii_becomes_hyphen() {
        assert_eq!(slugify("Café Ñu"), "caf-u");
    }

    #[test]
    fn long_ids_are_capped_without_trailing_hyphen() {
        let id = format!("{}!tail", "a".repeat(119));
        let slug = slugify(&id);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
        assert_eq!(slug, "a".repeat(119));

        assert_eq!(slugify(&"b".repeat(300)).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn slugify_is_idempotent() {
        for id in ["Foo Bar!", "City", "x--y", "  A/B/C  ", "ünïcødé"] {
            let once = slugify(id);
            assert_eq!(slugify(&once), once);
            assert!(once.chars().all(is_slug_char));
        }
    }

    #[test]
    fn empty_slug_falls_back() {
        assert_eq!(screenshot_name("???"), FALLBACK_NAME);
        assert_eq!(screenshot_name(""), FALLBACK_NAME);
        assert_eq!(screenshot_name("City"), "city");
    }
}
