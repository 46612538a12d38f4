use std::collections::BTreeSet;

use time::OffsetDateTime;

use super::pattern::TagPattern;
use super::role::RoleId;
use super::tag::Tag;

/// A tag rule as written by the policy author: a pattern plus the
/// constraints that apply to every tag matching it.
///
/// Rules are created via [`TagConfigurationBuilder`](super::TagConfiguration)
/// or by parsing a DSL string with
/// [`TagConfiguration::from_dsl()`](super::TagConfiguration::from_dsl). The
/// constraint list must be non-empty by compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub pattern: String,
    pub constraints: Vec<TagConstraint>,
}

/// One requirement a matching tag must satisfy.
///
/// Multiple rules can match the same tag; all their constraints combine with
/// AND semantics. Role lists within one constraint are any-of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagConstraint {
    /// The tag may not be added. Removing it stays possible, so an already
    /// forbidden tag can be cleaned up.
    Forbidden,
    /// Adding the tag requires at least one of these roles.
    AddRequiresRole(BTreeSet<RoleId>),
    /// Removing the tag requires at least one of these roles.
    RemoveRequiresRole(BTreeSet<RoleId>),
    /// Any change to the tag requires the caller to hold at least one role
    /// of any kind.
    Privileged,
    /// The tag may only be added or removed inside this window.
    Window(TimeWindow),
    /// The tag requires all of these tags to also be present in the final
    /// set. Checked in the condition phase, not against the delta.
    RequiresTags(BTreeSet<String>),
    /// The tag requires at least one present member of the named group.
    /// Checked in the condition phase.
    RequiresGroup(String),
}

/// An inclusive time window gating changes to a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub not_before: Option<OffsetDateTime>,
    pub not_after: Option<OffsetDateTime>,
}

impl TimeWindow {
    #[must_use]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.not_before.is_none_or(|start| instant >= start)
            && self.not_after.is_none_or(|end| instant <= end)
    }
}

/// A rule whose pattern has been compiled and whose constraint operands
/// have been normalized and resolved (required tags to [`Tag`] values,
/// group references to indices).
///
/// Produced by the compilation step and stored inside a
/// [`TagConfiguration`](super::TagConfiguration).
#[derive(Debug, Clone)]
pub(crate) struct CompiledTagRule {
    pub(crate) pattern: TagPattern,
    pub(crate) constraints: Vec<CompiledConstraint>,
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledConstraint {
    Forbidden,
    AddRequiresRole(BTreeSet<RoleId>),
    RemoveRequiresRole(BTreeSet<RoleId>),
    Privileged,
    Window(TimeWindow),
    RequiresTags(BTreeSet<Tag>),
    /// Index into the configuration's group list.
    RequiresGroup(usize),
}
