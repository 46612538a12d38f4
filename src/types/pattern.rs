use std::fmt;

use thiserror::Error;

use super::tag::Tag;

/// Errors produced when compiling a [`TagPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("pattern contains whitespace")]
    ContainsWhitespace,

    #[error("pattern contains adjacent wildcards")]
    AdjacentWildcards,
}

/// A compiled tag matcher: a literal tag name or a glob with `*` wildcards.
///
/// Patterns are compiled once at configuration-construction time so that
/// matching during validation is a cheap segment walk with no re-parsing.
/// Pattern text is normalized the same way tag text is (ASCII lowercase),
/// so `Locked` and `locked` compile to the same matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPattern {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

impl TagPattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if the pattern is empty, contains whitespace,
    /// or contains `**`.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(PatternError::ContainsWhitespace);
        }
        if trimmed.contains("**") {
            return Err(PatternError::AdjacentWildcards);
        }

        let normalized = trimmed.to_ascii_lowercase();
        let mut segments = Vec::new();
        let mut literal = String::new();
        for ch in normalized.chars() {
            if ch == '*' {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Wildcard);
            } else {
                literal.push(ch);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: normalized,
            segments,
        })
    }

    /// The normalized pattern text this matcher was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this pattern is a plain literal (no wildcards).
    #[must_use]
    pub fn is_literal(&self) -> bool {
        !self.segments.iter().any(|s| *s == Segment::Wildcard)
    }

    /// Test a tag against this pattern. `*` matches any run of characters,
    /// including the empty run.
    #[must_use]
    pub fn matches(&self, tag: &Tag) -> bool {
        Self::match_segments(&self.segments, tag.as_str())
    }

    fn match_segments(segments: &[Segment], input: &str) -> bool {
        match segments {
            [] => input.is_empty(),
            [Segment::Literal(lit), rest @ ..] => input
                .strip_prefix(lit.as_str())
                .is_some_and(|remaining| Self::match_segments(rest, remaining)),
            [Segment::Wildcard] => true,
            [Segment::Wildcard, rest @ ..] => (0..=input.len()).any(|split| {
                input.is_char_boundary(split) && Self::match_segments(rest, &input[split..])
            }),
        }
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    #[test]
    fn literal_matches_exactly() {
        let p = TagPattern::compile("locked").unwrap();
        assert!(p.is_literal());
        assert!(p.matches(&tag("locked")));
        assert!(!p.matches(&tag("locked2")));
        assert!(!p.matches(&tag("lock")));
    }

    #[test]
    fn pattern_is_case_normalized() {
        let p = TagPattern::compile("Locked").unwrap();
        assert_eq!(p.source(), "locked");
        assert!(p.matches(&tag("LOCKED")));
    }

    #[test]
    fn trailing_wildcard() {
        let p = TagPattern::compile("_*").unwrap();
        assert!(!p.is_literal());
        assert!(p.matches(&tag("_system")));
        assert!(p.matches(&tag("_")));
        assert!(!p.matches(&tag("system")));
    }

    #[test]
    fn leading_wildcard() {
        let p = TagPattern::compile("*-draft").unwrap();
        assert!(p.matches(&tag("page-draft")));
        assert!(p.matches(&tag("-draft")));
        assert!(!p.matches(&tag("draft")));
    }

    #[test]
    fn interior_wildcard() {
        let p = TagPattern::compile("event-*-2026").unwrap();
        assert!(p.matches(&tag("event-summer-2026")));
        assert!(!p.matches(&tag("event-summer-2025")));
    }

    #[test]
    fn multiple_wildcards() {
        let p = TagPattern::compile("*a*b*").unwrap();
        assert!(p.matches(&tag("xaxbx")));
        assert!(p.matches(&tag("ab")));
        assert!(!p.matches(&tag("ba")));
    }

    #[test]
    fn bare_wildcard_matches_everything() {
        let p = TagPattern::compile("*").unwrap();
        assert!(p.matches(&tag("anything")));
    }

    #[test]
    fn non_ascii_tags_match() {
        let p = TagPattern::compile("caf*").unwrap();
        assert!(p.matches(&tag("café")));
    }

    #[test]
    fn compile_rejects_empty() {
        assert_eq!(TagPattern::compile(""), Err(PatternError::Empty));
        assert_eq!(TagPattern::compile("  "), Err(PatternError::Empty));
    }

    #[test]
    fn compile_rejects_whitespace() {
        assert_eq!(
            TagPattern::compile("a b"),
            Err(PatternError::ContainsWhitespace)
        );
    }

    #[test]
    fn compile_rejects_adjacent_wildcards() {
        assert_eq!(
            TagPattern::compile("a**"),
            Err(PatternError::AdjacentWildcards)
        );
    }
}
