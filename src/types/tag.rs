use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced when constructing a [`Tag`] from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("tag is empty")]
    Empty,

    #[error("tag '{tag}' contains whitespace")]
    ContainsWhitespace { tag: String },

    #[error("tag '{tag}' exceeds {limit} characters")]
    TooLong { tag: String, limit: usize },
}

/// A normalized page tag.
///
/// Tags are opaque string labels compared by value. Construction normalizes
/// the input (trims surrounding whitespace, lowercases ASCII) and rejects
/// malformed values, so every `Tag` in circulation is well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Maximum allowed tag length in bytes, after trimming.
    pub const MAX_LENGTH: usize = 64;

    /// Create a tag from raw input.
    ///
    /// # Errors
    ///
    /// Returns [`TagError`] if the input is empty after trimming, contains
    /// interior whitespace, or exceeds [`Tag::MAX_LENGTH`].
    pub fn new(raw: &str) -> Result<Self, TagError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TagError::ContainsWhitespace {
                tag: trimmed.to_owned(),
            });
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(TagError::TooLong {
                tag: trimmed.to_owned(),
                limit: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Tag {
    type Error = TagError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

/// An unordered set of [`Tag`]s.
///
/// Backs a page's tag collection: O(1) membership, no duplicates, no order.
/// Insertion order carries no meaning; [`Display`](fmt::Display) and
/// [`sorted()`](TagSet::sorted) order lexicographically for deterministic
/// output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: HashSet<Tag>,
}

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated tag line (the on-page tag format).
    ///
    /// # Errors
    ///
    /// Returns [`TagError`] if any entry is not a well-formed tag.
    pub fn parse_line(line: &str) -> Result<Self, TagError> {
        line.split_whitespace().map(Tag::new).collect()
    }

    /// Insert a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.tags.insert(tag)
    }

    /// Remove a tag. Returns `false` if it was not present.
    pub fn remove(&mut self, tag: &Tag) -> bool {
        self.tags.remove(tag)
    }

    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Tag> {
        self.tags.iter()
    }

    /// Tags present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &TagSet) -> TagSet {
        self.tags.difference(&other.tags).cloned().collect()
    }

    /// Tags sorted lexicographically, for deterministic reporting.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.tags.iter().collect();
        tags.sort();
        tags
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        self.tags.extend(iter);
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = hash_set::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

impl IntoIterator for TagSet {
    type Item = Tag;
    type IntoIter = hash_set::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.into_iter()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in self.sorted() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            f.write_str(tag.as_str())?;
        }
        Ok(())
    }
}
