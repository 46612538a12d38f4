use std::fmt;

use super::group::GroupCondition;
use super::tag::TagSet;

/// A violated group condition: the group's name, the condition it imposes,
/// and the member tags present in the proposed set.
///
/// For minimum-count conditions the member set can be empty (the violation
/// is that too few members are present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupViolation {
    group: String,
    condition: GroupCondition,
    members: TagSet,
}

impl GroupViolation {
    pub(crate) fn new(group: impl Into<String>, condition: GroupCondition, members: TagSet) -> Self {
        Self {
            group: group.into(),
            condition,
            members,
        }
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn condition(&self) -> GroupCondition {
        self.condition
    }

    #[must_use]
    pub fn members(&self) -> &TagSet {
        &self.members
    }
}

impl fmt::Display for GroupViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            write!(f, "group '{}' requires {}", self.group, self.condition)
        } else {
            write!(
                f,
                "group '{}' requires {}, present: {}",
                self.group, self.condition, self.members
            )
        }
    }
}

/// Outcome of the condition phase: per-tag condition failures and group
/// violations, both evaluated against the final proposed tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionReport {
    /// Tags whose standalone conditions (required tags, required group) are
    /// unsatisfied.
    pub tags: TagSet,
    /// Violated group conditions, in group-definition order.
    pub groups: Vec<GroupViolation>,
}

/// The structured verdict of one validation call.
///
/// Constructed only by [`TagConfiguration::validate()`](super::TagConfiguration::validate);
/// immutable afterwards. Equality is structural so identical inputs yield
/// equal decisions, which keeps tests deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct TagDecision {
    valid: bool,
    invalid_tags: TagSet,
    failed_tag_conditions: TagSet,
    failed_tag_group_conditions: Vec<GroupViolation>,
}

impl TagDecision {
    /// `valid` is derived: true iff every detail collection is empty.
    pub(crate) fn new(
        invalid_tags: TagSet,
        failed_tag_conditions: TagSet,
        failed_tag_group_conditions: Vec<GroupViolation>,
    ) -> Self {
        let valid = invalid_tags.is_empty()
            && failed_tag_conditions.is_empty()
            && failed_tag_group_conditions.is_empty();
        Self {
            valid,
            invalid_tags,
            failed_tag_conditions,
            failed_tag_group_conditions,
        }
    }

    /// True iff no violation was found; the caller may persist the new tag set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Tags in the delta that individually violated a tag-level rule.
    #[must_use]
    pub fn invalid_tags(&self) -> &TagSet {
        &self.invalid_tags
    }

    /// Tags in the final set whose standalone conditions are unsatisfied.
    #[must_use]
    pub fn failed_tag_conditions(&self) -> &TagSet {
        &self.failed_tag_conditions
    }

    /// Violated group conditions, in group-definition order.
    #[must_use]
    pub fn failed_tag_group_conditions(&self) -> &[GroupViolation] {
        &self.failed_tag_group_conditions
    }
}

impl fmt::Display for TagDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "valid");
        }
        write!(f, "invalid")?;
        if !self.invalid_tags.is_empty() {
            write!(f, "; rejected tags: {}", self.invalid_tags)?;
        }
        if !self.failed_tag_conditions.is_empty() {
            write!(f, "; unmet tag conditions: {}", self.failed_tag_conditions)?;
        }
        for violation in &self.failed_tag_group_conditions {
            write!(f, "; {violation}")?;
        }
        Ok(())
    }
}
