//! URL-safe identifiers for doctor profiles and articles.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const MAX_SLUG_LEN: usize = 80;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Normalize free text into a slug: strip diacritics, lowercase, and join
/// alphanumeric runs with single hyphens.
///
/// Returns an empty string when nothing alphanumeric survives.
pub fn slugify(input: &str) -> String {
    let folded: String = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(fold_special)
        .collect::<String>()
        .to_lowercase();

    let hyphenated = NON_ALNUM.replace_all(&folded, "-");
    let mut slug = hyphenated.trim_matches('-').to_string();

    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    slug
}

/// Letters that do not decompose into base + combining mark.
fn fold_special(c: char) -> char {
    match c {
        'ß' => 's',
        'ø' | 'Ø' => 'o',
        'đ' | 'Đ' => 'd',
        'ł' | 'Ł' => 'l',
        'æ' | 'Æ' => 'a',
        other => other,
    }
}

/// First candidate not already taken: `base`, `base-2`, `base-3`, ...
pub fn first_free<F>(base: &str, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Resolve against the list of existing slugs sharing `base` as a prefix.
pub fn unique_slug(base: &str, existing: &[String]) -> String {
    first_free(base, |candidate| existing.iter().any(|s| s == candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Gerardo Pérez", "gerardo-perez")]
    #[test_case("  Dra. María José Núñez  ", "dra-maria-jose-nunez")]
    #[test_case("Ángel O'Connor-Smith", "angel-o-connor-smith")]
    #[test_case("Zoë Straße", "zoe-strase")]
    #[test_case("10 tips for healthy sleep!!", "10-tips-for-healthy-sleep")]
    #[test_case("---", "")]
    #[test_case("", "")]
    fn slugify_cases(input: &str, expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn long_titles_are_truncated_without_trailing_hyphen() {
        let title = "word ".repeat(40);
        let slug = slugify(&title);
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn collisions_take_the_next_numeric_suffix() {
        let existing = vec!["ana-lopez".to_string(), "ana-lopez-2".to_string()];
        assert_eq!(unique_slug("ana-lopez", &existing), "ana-lopez-3");
        assert_eq!(unique_slug("ana-lopez-2", &[]), "ana-lopez-2");
        assert_eq!(unique_slug("ana", &existing), "ana");
    }

    #[test]
    fn gaps_are_reused() {
        let existing = vec!["x".to_string(), "x-3".to_string()];
        assert_eq!(unique_slug("x", &existing), "x-2");
    }
}
