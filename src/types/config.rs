use std::fmt;

use time::OffsetDateTime;

use super::decision::{ConditionReport, TagDecision};
use super::error::CompileError;
use super::group::{CompiledGroup, GroupCondition, TagGroup};
use super::role::{RoleId, RoleSet};
use super::rule::{CompiledTagRule, TagConstraint, TagRule, TimeWindow};
use super::tag::{Tag, TagSet};

/// Builder for constructing a [`TagConfiguration`].
///
/// Rules and groups are defined via closures and compiled into an immutable,
/// thread-safe configuration.
///
/// # Example
///
/// ```
/// use tagward::TagConfigurationBuilder;
///
/// let config = TagConfigurationBuilder::new()
///     .tag("locked", |t| t.add_requires(["moderator"]))
///     .tag("spam", |t| t.forbidden())
///     .group("colors", |g| g.members(["red", "blue", "green"]).exclusive())
///     .compile()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct TagConfigurationBuilder {
    rules: Vec<TagRule>,
    groups: Vec<TagGroup>,
}

/// Intermediate builder passed to the tag rule definition closure.
#[derive(Debug, Default)]
pub struct TagRuleBuilder {
    constraints: Vec<TagConstraint>,
}

/// Intermediate builder passed to the group definition closure.
#[derive(Debug, Default)]
pub struct GroupBuilder {
    members: Vec<String>,
    condition: Option<GroupCondition>,
}

impl TagConfigurationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a rule for every tag matching `pattern`. The closure must add
    /// at least one constraint, or compilation fails with
    /// [`CompileError::EmptyRule`].
    #[must_use]
    pub fn tag(mut self, pattern: &str, f: impl FnOnce(TagRuleBuilder) -> TagRuleBuilder) -> Self {
        let builder = f(TagRuleBuilder::default());
        self.rules.push(TagRule {
            pattern: pattern.to_owned(),
            constraints: builder.constraints,
        });
        self
    }

    /// Define a named group of member patterns. The closure must set members
    /// and exactly one condition, or compilation fails.
    #[must_use]
    pub fn group(mut self, name: &str, f: impl FnOnce(GroupBuilder) -> GroupBuilder) -> Self {
        let builder = f(GroupBuilder::default());
        self.groups.push(TagGroup {
            name: name.to_owned(),
            members: builder.members,
            condition: builder.condition,
        });
        self
    }

    /// Compile the policy into an immutable `TagConfiguration`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if validation fails.
    pub fn compile(self) -> Result<TagConfiguration, CompileError> {
        crate::compile::compile(&self.rules, &self.groups)
    }
}

impl TagRuleBuilder {
    /// The tag may not be added.
    #[must_use]
    pub fn forbidden(mut self) -> Self {
        self.constraints.push(TagConstraint::Forbidden);
        self
    }

    /// Any change to the tag requires the caller to hold at least one role.
    #[must_use]
    pub fn privileged(mut self) -> Self {
        self.constraints.push(TagConstraint::Privileged);
        self
    }

    /// Adding the tag requires at least one of the given roles.
    #[must_use]
    pub fn add_requires<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        self.constraints.push(TagConstraint::AddRequiresRole(
            roles.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Removing the tag requires at least one of the given roles.
    #[must_use]
    pub fn remove_requires<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        self.constraints.push(TagConstraint::RemoveRequiresRole(
            roles.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// The tag may only change at or after `instant`.
    #[must_use]
    pub fn not_before(mut self, instant: OffsetDateTime) -> Self {
        self.constraints.push(TagConstraint::Window(TimeWindow {
            not_before: Some(instant),
            not_after: None,
        }));
        self
    }

    /// The tag may only change at or before `instant`.
    #[must_use]
    pub fn not_after(mut self, instant: OffsetDateTime) -> Self {
        self.constraints.push(TagConstraint::Window(TimeWindow {
            not_before: None,
            not_after: Some(instant),
        }));
        self
    }

    /// The tag may only change inside `start..=end`.
    #[must_use]
    pub fn window(mut self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.constraints.push(TagConstraint::Window(TimeWindow {
            not_before: Some(start),
            not_after: Some(end),
        }));
        self
    }

    /// The tag requires all of the given tags to also be present.
    #[must_use]
    pub fn needs_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(TagConstraint::RequiresTags(
            tags.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// The tag requires at least one present member of the named group.
    #[must_use]
    pub fn needs_group(mut self, name: &str) -> Self {
        self.constraints
            .push(TagConstraint::RequiresGroup(name.to_owned()));
        self
    }
}

impl GroupBuilder {
    /// Add member patterns to the group.
    #[must_use]
    pub fn members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    /// At most one member may be present.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.condition = Some(GroupCondition::Exclusive);
        self
    }

    /// At most `max` members may be present.
    #[must_use]
    pub fn at_most(mut self, max: usize) -> Self {
        self.condition = Some(GroupCondition::AtMost(max));
        self
    }

    /// At least `min` members must be present.
    #[must_use]
    pub fn at_least(mut self, min: usize) -> Self {
        self.condition = Some(GroupCondition::AtLeast(min));
        self
    }

    /// Member count must fall within `min..=max`.
    #[must_use]
    pub fn between(mut self, min: usize, max: usize) -> Self {
        self.condition = Some(GroupCondition::Between { min, max });
        self
    }
}

/// A compiled, immutable tagging policy for one site. Thread-safe and
/// designed to live behind `Arc`.
///
/// All malformed-configuration conditions fail at construction; the
/// validation methods never fail, they only report.
#[derive(Debug)]
pub struct TagConfiguration {
    pub(crate) rules: Vec<CompiledTagRule>,
    pub(crate) groups: Vec<CompiledGroup>,
}

impl TagConfiguration {
    /// Validate a proposed tag change.
    ///
    /// Computes the delta between `previous` and `current`, captures the
    /// current instant once, checks the delta against per-tag rules and the
    /// final set against group and standalone conditions, and folds both
    /// checks into a single [`TagDecision`].
    ///
    /// Pure computation: no I/O, no logging, no retries. Persisting the new
    /// tag set on a valid decision is the caller's responsibility.
    pub fn validate(&self, previous: &TagSet, current: &TagSet, roles: &RoleSet) -> TagDecision {
        self.validate_at(previous, current, roles, OffsetDateTime::now_utc())
    }

    /// [`validate()`](Self::validate) with an explicit instant, so temporal
    /// conditions can be tested deterministically.
    pub fn validate_at(
        &self,
        previous: &TagSet,
        current: &TagSet,
        roles: &RoleSet,
        now: OffsetDateTime,
    ) -> TagDecision {
        crate::validate::validate(self, previous, current, roles, now)
    }

    /// Check added and removed tags against per-tag rules.
    ///
    /// Returns the subset of the delta that failed at least one applicable
    /// rule; an empty set means full validity. Tags matching no rule are
    /// implicitly valid.
    #[must_use]
    pub fn validate_tags(
        &self,
        added: &TagSet,
        removed: &TagSet,
        roles: &RoleSet,
        now: OffsetDateTime,
    ) -> TagSet {
        crate::validate::validate_tags(self, added, removed, roles, now)
    }

    /// Evaluate group conditions and standalone per-tag conditions against
    /// the final proposed tag set.
    #[must_use]
    pub fn validate_conditions(&self, current: &TagSet) -> ConditionReport {
        crate::validate::validate_conditions(self, current)
    }

    /// Parse a policy DSL string and compile it.
    ///
    /// This is a convenience method combining parsing and
    /// [`TagConfigurationBuilder::compile()`].
    ///
    /// # Errors
    ///
    /// Returns [`TagwardError`](crate::TagwardError) on parse or compile failure.
    pub fn from_dsl(input: &str) -> Result<Self, crate::TagwardError> {
        let parsed = crate::parse::parse(input)?;
        let config = crate::compile::compile(&parsed.rules, &parsed.groups)?;
        Ok(config)
    }

    /// Read a policy DSL file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`TagwardError`](crate::TagwardError) on I/O, parse, or
    /// compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::TagwardError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether the configuration has no rules and no groups. An empty
    /// configuration admits every change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.groups.is_empty()
    }

    /// The compiled rule patterns, in definition order.
    #[must_use]
    pub fn rule_patterns(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.pattern.source()).collect()
    }

    /// The group names, in definition order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Patterns of the rules that apply to a given tag.
    ///
    /// Useful for explaining to a page author why a tag was rejected.
    #[must_use]
    pub fn rules_matching(&self, tag: &Tag) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.pattern.matches(tag))
            .map(|r| r.pattern.source())
            .collect()
    }
}

#[cfg(feature = "binary-cache")]
impl TagConfiguration {
    /// Serialize this compiled configuration to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata. Callers can use this to detect when the original
    /// policy source has changed and the cache should be rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a compiled configuration from a byte slice previously
    /// produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this compiled configuration and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the compiled configuration it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for TagConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TagConfiguration({} rules, {} groups)",
            self.rules.len(),
            self.groups.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_rules_and_groups() {
        let builder = TagConfigurationBuilder::new()
            .tag("locked", |t| t.add_requires(["moderator"]))
            .tag("spam", |t| t.forbidden())
            .group("colors", |g| g.members(["red", "blue"]).exclusive());

        assert_eq!(builder.rules.len(), 2);
        assert_eq!(builder.groups.len(), 1);
        assert_eq!(builder.rules[0].pattern, "locked");
        assert_eq!(builder.rules[1].pattern, "spam");
        assert_eq!(builder.groups[0].name, "colors");
        assert_eq!(builder.groups[0].condition, Some(GroupCondition::Exclusive));
    }

    #[test]
    fn builder_rule_without_constraints_returns_error() {
        let result = TagConfigurationBuilder::new().tag("bare", |t| t).compile();
        assert!(matches!(
            result,
            Err(CompileError::EmptyRule { pattern }) if pattern == "bare"
        ));
    }

    #[test]
    fn builder_group_without_condition_returns_error() {
        let result = TagConfigurationBuilder::new()
            .group("colors", |g| g.members(["red", "blue"]))
            .compile();
        assert!(matches!(
            result,
            Err(CompileError::MissingCondition { group }) if group == "colors"
        ));
    }

    #[test]
    fn last_condition_wins() {
        let config = TagConfigurationBuilder::new()
            .group("colors", |g| g.members(["red", "blue"]).at_most(5).exclusive())
            .compile()
            .unwrap();
        assert_eq!(config.groups[0].condition, GroupCondition::Exclusive);
    }

    #[test]
    fn empty_configuration_compiles() {
        let config = TagConfigurationBuilder::new().compile().unwrap();
        assert!(config.is_empty());
        assert_eq!(config.rule_count(), 0);
        assert_eq!(config.group_count(), 0);
    }

    #[test]
    fn introspection() {
        let config = TagConfigurationBuilder::new()
            .tag("locked", |t| t.privileged())
            .tag("_*", |t| t.privileged())
            .group("colors", |g| g.members(["red", "blue"]).exclusive())
            .compile()
            .unwrap();

        assert_eq!(config.rule_patterns(), vec!["locked", "_*"]);
        assert_eq!(config.group_names(), vec!["colors"]);
        assert_eq!(
            config.rules_matching(&Tag::new("_system").unwrap()),
            vec!["_*"]
        );
        assert_eq!(config.to_string(), "TagConfiguration(2 rules, 1 groups)");
    }
}
