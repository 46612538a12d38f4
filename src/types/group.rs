use std::fmt;

use super::pattern::TagPattern;

/// A tag group as written by the policy author: a named set of member
/// tag-patterns subject to one collective condition.
///
/// The condition is `None` until set with a [`GroupBuilder`](super::GroupBuilder)
/// condition method; compilation fails if it is still unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub name: String,
    pub members: Vec<String>,
    pub condition: Option<GroupCondition>,
}

/// The collective condition a group imposes on the final tag set.
///
/// Conditions count how many present tags match any member pattern; bounds
/// are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCondition {
    /// At most one member may be present.
    Exclusive,
    /// At most `n` members may be present.
    AtMost(usize),
    /// At least `n` members must be present.
    AtLeast(usize),
    /// Member count must fall within `min..=max`.
    Between { min: usize, max: usize },
}

impl GroupCondition {
    /// Whether a member count satisfies this condition.
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        match *self {
            GroupCondition::Exclusive => count <= 1,
            GroupCondition::AtMost(max) => count <= max,
            GroupCondition::AtLeast(min) => count >= min,
            GroupCondition::Between { min, max } => count >= min && count <= max,
        }
    }
}

impl fmt::Display for GroupCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GroupCondition::Exclusive => write!(f, "at most one member"),
            GroupCondition::AtMost(max) => write!(f, "at most {max} members"),
            GroupCondition::AtLeast(min) => write!(f, "at least {min} members"),
            GroupCondition::Between { min, max } => {
                write!(f, "between {min} and {max} members")
            }
        }
    }
}

/// A group whose member patterns have been compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledGroup {
    pub(crate) name: String,
    pub(crate) members: Vec<TagPattern>,
    pub(crate) condition: GroupCondition,
}
