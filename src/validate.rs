use time::OffsetDateTime;

use crate::types::{CompiledConstraint, CompiledGroup, CompiledTagRule};
use crate::{ConditionReport, GroupViolation, RoleSet, Tag, TagConfiguration, TagDecision, TagSet};

/// Which side of the delta a tag sits on.
#[derive(Debug, Clone, Copy)]
enum Change {
    Add,
    Remove,
}

pub(crate) fn validate(
    config: &TagConfiguration,
    previous: &TagSet,
    current: &TagSet,
    roles: &RoleSet,
    now: OffsetDateTime,
) -> TagDecision {
    let added = current.difference(previous);
    let removed = previous.difference(current);

    let invalid_tags = validate_tags(config, &added, &removed, roles, now);
    let report = validate_conditions(config, current);

    TagDecision::new(invalid_tags, report.tags, report.groups)
}

pub(crate) fn validate_tags(
    config: &TagConfiguration,
    added: &TagSet,
    removed: &TagSet,
    roles: &RoleSet,
    now: OffsetDateTime,
) -> TagSet {
    let mut invalid = TagSet::new();
    for tag in added {
        if !change_allowed(config, tag, Change::Add, roles, now) {
            invalid.insert(tag.clone());
        }
    }
    for tag in removed {
        if !change_allowed(config, tag, Change::Remove, roles, now) {
            invalid.insert(tag.clone());
        }
    }
    invalid
}

pub(crate) fn validate_conditions(config: &TagConfiguration, current: &TagSet) -> ConditionReport {
    let mut failed_tags = TagSet::new();
    for tag in current {
        if !conditions_satisfied(config, tag, current) {
            failed_tags.insert(tag.clone());
        }
    }

    let mut violations = Vec::new();
    for group in &config.groups {
        let members: TagSet = current
            .iter()
            .filter(|tag| group_contains(group, tag))
            .cloned()
            .collect();
        if !group.condition.admits(members.len()) {
            violations.push(GroupViolation::new(
                group.name.clone(),
                group.condition,
                members,
            ));
        }
    }

    ConditionReport {
        tags: failed_tags,
        groups: violations,
    }
}

/// AND across all matching rules and all their delta-phase constraints.
fn change_allowed(
    config: &TagConfiguration,
    tag: &Tag,
    change: Change,
    roles: &RoleSet,
    now: OffsetDateTime,
) -> bool {
    config
        .rules
        .iter()
        .filter(|rule| rule.pattern.matches(tag))
        .all(|rule| {
            rule.constraints
                .iter()
                .all(|constraint| constraint_allows(constraint, change, roles, now))
        })
}

fn constraint_allows(
    constraint: &CompiledConstraint,
    change: Change,
    roles: &RoleSet,
    now: OffsetDateTime,
) -> bool {
    match constraint {
        // Forbidden blocks additions only; removing a forbidden tag restores
        // compliance and must stay possible.
        CompiledConstraint::Forbidden => matches!(change, Change::Remove),
        CompiledConstraint::AddRequiresRole(required) => {
            !matches!(change, Change::Add) || required.iter().any(|role| roles.contains(role))
        }
        CompiledConstraint::RemoveRequiresRole(required) => {
            !matches!(change, Change::Remove) || required.iter().any(|role| roles.contains(role))
        }
        CompiledConstraint::Privileged => !roles.is_empty(),
        CompiledConstraint::Window(window) => window.contains(now),
        // Condition-phase constraints; not part of the delta check.
        CompiledConstraint::RequiresTags(_) | CompiledConstraint::RequiresGroup(_) => true,
    }
}

/// AND across all matching rules' condition-phase constraints, evaluated
/// against the final proposed set.
fn conditions_satisfied(config: &TagConfiguration, tag: &Tag, current: &TagSet) -> bool {
    config
        .rules
        .iter()
        .filter(|rule| rule.pattern.matches(tag))
        .flat_map(|rule: &CompiledTagRule| rule.constraints.iter())
        .all(|constraint| match constraint {
            CompiledConstraint::RequiresTags(required) => {
                required.iter().all(|t| current.contains(t))
            }
            CompiledConstraint::RequiresGroup(idx) => {
                let group = &config.groups[*idx];
                current.iter().any(|t| group_contains(group, t))
            }
            _ => true,
        })
}

fn group_contains(group: &CompiledGroup, tag: &Tag) -> bool {
    group.members.iter().any(|pattern| pattern.matches(tag))
}
