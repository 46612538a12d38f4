use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{CompiledConstraint, CompiledGroup, CompiledTagRule};
use crate::{
    CompileError, GroupCondition, Tag, TagConfiguration, TagConstraint, TagGroup, TagPattern,
    TagRule,
};

pub(crate) fn compile(
    rules: &[TagRule],
    groups: &[TagGroup],
) -> Result<TagConfiguration, CompileError> {
    check_duplicate_rules(rules)?;
    check_duplicate_groups(groups)?;

    let compiled_groups: Vec<CompiledGroup> = groups
        .iter()
        .map(compile_group)
        .collect::<Result<_, _>>()?;

    let group_indices: HashMap<&str, usize> = compiled_groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.name.as_str(), i))
        .collect();

    let compiled_rules: Vec<CompiledTagRule> = rules
        .iter()
        .map(|rule| compile_rule(rule, &group_indices))
        .collect::<Result<_, _>>()?;

    Ok(TagConfiguration {
        rules: compiled_rules,
        groups: compiled_groups,
    })
}

fn check_duplicate_rules(rules: &[TagRule]) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(&rule.pattern) {
            return Err(CompileError::DuplicateRule {
                pattern: rule.pattern.clone(),
            });
        }
    }
    Ok(())
}

fn check_duplicate_groups(groups: &[TagGroup]) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    for group in groups {
        if !seen.insert(&group.name) {
            return Err(CompileError::DuplicateGroup {
                name: group.name.clone(),
            });
        }
    }
    Ok(())
}

fn compile_group(group: &TagGroup) -> Result<CompiledGroup, CompileError> {
    if group.members.is_empty() {
        return Err(CompileError::EmptyGroup {
            group: group.name.clone(),
        });
    }
    let condition = group
        .condition
        .ok_or_else(|| CompileError::MissingCondition {
            group: group.name.clone(),
        })?;
    if let GroupCondition::Between { min, max } = condition {
        if min > max {
            return Err(CompileError::InvalidGroupBounds {
                group: group.name.clone(),
                min,
                max,
            });
        }
    }

    let members: Vec<TagPattern> = group
        .members
        .iter()
        .map(|member| compile_pattern(member))
        .collect::<Result<_, _>>()?;

    Ok(CompiledGroup {
        name: group.name.clone(),
        members,
        condition,
    })
}

fn compile_rule(
    rule: &TagRule,
    group_indices: &HashMap<&str, usize>,
) -> Result<CompiledTagRule, CompileError> {
    if rule.constraints.is_empty() {
        return Err(CompileError::EmptyRule {
            pattern: rule.pattern.clone(),
        });
    }
    let pattern = compile_pattern(&rule.pattern)?;

    let constraints: Vec<CompiledConstraint> = rule
        .constraints
        .iter()
        .map(|constraint| compile_constraint(constraint, &rule.pattern, group_indices))
        .collect::<Result<_, _>>()?;

    Ok(CompiledTagRule {
        pattern,
        constraints,
    })
}

fn compile_constraint(
    constraint: &TagConstraint,
    rule_pattern: &str,
    group_indices: &HashMap<&str, usize>,
) -> Result<CompiledConstraint, CompileError> {
    match constraint {
        TagConstraint::Forbidden => Ok(CompiledConstraint::Forbidden),
        TagConstraint::Privileged => Ok(CompiledConstraint::Privileged),
        TagConstraint::AddRequiresRole(roles) => {
            if roles.is_empty() {
                return Err(CompileError::EmptyRoleList {
                    pattern: rule_pattern.to_owned(),
                });
            }
            Ok(CompiledConstraint::AddRequiresRole(roles.clone()))
        }
        TagConstraint::RemoveRequiresRole(roles) => {
            if roles.is_empty() {
                return Err(CompileError::EmptyRoleList {
                    pattern: rule_pattern.to_owned(),
                });
            }
            Ok(CompiledConstraint::RemoveRequiresRole(roles.clone()))
        }
        TagConstraint::Window(window) => {
            if let (Some(start), Some(end)) = (window.not_before, window.not_after) {
                if start > end {
                    return Err(CompileError::InvalidWindow {
                        pattern: rule_pattern.to_owned(),
                    });
                }
            }
            Ok(CompiledConstraint::Window(*window))
        }
        TagConstraint::RequiresTags(raw) => {
            if raw.is_empty() {
                return Err(CompileError::EmptyTagList {
                    pattern: rule_pattern.to_owned(),
                });
            }
            let tags: BTreeSet<Tag> = raw
                .iter()
                .map(|t| {
                    Tag::new(t).map_err(|source| CompileError::InvalidRequiredTag {
                        pattern: rule_pattern.to_owned(),
                        source,
                    })
                })
                .collect::<Result<_, _>>()?;
            Ok(CompiledConstraint::RequiresTags(tags))
        }
        TagConstraint::RequiresGroup(name) => group_indices
            .get(name.as_str())
            .map(|&idx| CompiledConstraint::RequiresGroup(idx))
            .ok_or_else(|| CompileError::UndefinedGroup {
                pattern: rule_pattern.to_owned(),
                group: name.clone(),
            }),
    }
}

fn compile_pattern(source: &str) -> Result<TagPattern, CompileError> {
    TagPattern::compile(source).map_err(|err| CompileError::InvalidPattern {
        pattern: source.to_owned(),
        source: err,
    })
}
