//! Human-readable path fragments derived from titles and comment bodies.

/// Maximum slug length for issue directory names.
pub const ISSUE_SLUG_LEN: usize = 32;

/// Maximum slug length for comment file names.
pub const COMMENT_SLUG_LEN: usize = 20;

const FALLBACK: &str = "untitled";

/// Turn arbitrary text into a lowercase `a-z0-9` slug joined by single
/// dashes, at most `max_len` bytes long.
///
/// Characters outside ASCII alphanumerics act as separators. Text with no
/// usable characters becomes `untitled`.
#[must_use]
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len().min(max_len));
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch != '\'' {
            // apostrophes join rather than split ("don't" -> "dont")
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return FALLBACK.to_string();
    }

    if slug.len() > max_len {
        slug.truncate(max_len);
        while slug.ends_with('-') {
            slug.pop();
        }
    }

    if slug.is_empty() {
        FALLBACK.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_collapses_to_single_dash() {
        assert_eq!(slugify("Fix: crash -- on   start!", 32), "fix-crash-on-start");
    }

    #[test]
    fn empty_and_symbol_only_text_falls_back() {
        assert_eq!(slugify("", 32), "untitled");
        assert_eq!(slugify("!!! ???", 32), "untitled");
    }

    #[test]
    fn truncation_drops_trailing_dash() {
        // "abcd-efgh" cut at 5 would end in '-'
        assert_eq!(slugify("abcd efgh", 5), "abcd");
    }

    #[test]
    fn non_ascii_characters_separate_words() {
        assert_eq!(slugify("café au lait", 32), "caf-au-lait");
    }

    #[test]
    fn apostrophes_are_dropped() {
        assert_eq!(slugify("Don't panic", ISSUE_SLUG_LEN), "dont-panic");
    }

    #[test]
    fn comment_slug_limit_is_respected() {
        let slug = slugify("this is a rather long first line of a comment", COMMENT_SLUG_LEN);
        assert!(slug.len() <= COMMENT_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }
}
