use globset::{Glob, GlobMatcher};
use std::fmt;

/// Glob-style pattern where `*` matches any substring, including `/`.
/// A pattern without any glob glyph only matches the identical string.
#[derive(Clone)]
pub struct Wildcard {
    pattern: String,
    matcher: Option<GlobMatcher>,
}

impl Wildcard {
    pub fn new(pattern: &str) -> Result<Self, globset::Error> {
        let matcher = if pattern
            .chars()
            .any(|c| matches!(c, '*' | '?' | '[' | '{'))
        {
            Some(Glob::new(pattern)?.compile_matcher())
        } else {
            None
        };

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(value),
            None => self.pattern == value,
        }
    }
}

impl fmt::Debug for Wildcard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Wildcard").field(&self.pattern).finish()
    }
}

impl PartialEq for Wildcard {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_matches_only_itself() {
        let wildcard = Wildcard::new("textures/stone/wall01").unwrap();
        assert!(wildcard.matches("textures/stone/wall01"));
        assert!(!wildcard.matches("textures/stone/wall012"));
        assert!(!wildcard.matches("textures/stone"));
    }

    #[test]
    fn star_matches_any_substring() {
        let wildcard = Wildcard::new("*.prt").unwrap();
        assert!(wildcard.matches("smoke.prt"));
        assert!(wildcard.matches("fx/chimney/smoke.prt"));
        assert!(!wildcard.matches("smoke.prt.bak"));

        let wildcard = Wildcard::new("textures/*/wall*").unwrap();
        assert!(wildcard.matches("textures/stone/wall01"));
        assert!(wildcard.matches("textures/old/stone/wall"));
        assert!(!wildcard.matches("textures/stone/floor"));
    }
}
