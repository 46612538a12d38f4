use std::collections::BTreeSet;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use winnow::ascii::{dec_uint, till_line_ending};
use winnow::combinator::{alt, cut_err, preceded, repeat, separated};
use winnow::error::{ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, take_while};

use crate::{GroupCondition, RoleId, TagConstraint, TagGroup, TagRule, TimeWindow};

use super::parser::ParsedPolicy;

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_ascii_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn ws1(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Names, patterns, roles -------------------------------------------------

fn bare_word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '*' | ':' | '.')
    })
    .parse_next(input)
}

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

/// A tag pattern, role, or group name: a bare word or a quoted string.
fn name(input: &mut &str) -> ModalResult<String> {
    preceded(ws, alt((string_literal, bare_word.map(ToOwned::to_owned)))).parse_next(input)
}

fn name_list(input: &mut &str) -> ModalResult<Vec<String>> {
    separated(1.., name, (ws, ',')).parse_next(input)
}

// -- Timestamps -------------------------------------------------------------

fn timestamp(input: &mut &str) -> ModalResult<OffsetDateTime> {
    ws.parse_next(input)?;
    take_while(1.., |c: char| !c.is_whitespace() && c != '}' && c != ',')
        .try_map(|s: &str| OffsetDateTime::parse(s, &Rfc3339))
        .context(StrContext::Expected(StrContextValue::Description(
            "RFC 3339 timestamp",
        )))
        .parse_next(input)
}

// -- Tag rule clauses -------------------------------------------------------

fn tag_clause(input: &mut &str) -> ModalResult<TagConstraint> {
    ws.parse_next(input)?;
    alt((
        "forbidden".value(TagConstraint::Forbidden),
        "privileged".value(TagConstraint::Privileged),
        add_requires,
        remove_requires,
        after_clause,
        until_clause,
        needs_group_clause,
        needs_tags_clause,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "tag rule clause",
    )))
    .parse_next(input)
}

fn role_list(input: &mut &str) -> ModalResult<BTreeSet<RoleId>> {
    name_list
        .map(|names| names.into_iter().map(RoleId::from).collect())
        .parse_next(input)
}

fn add_requires(input: &mut &str) -> ModalResult<TagConstraint> {
    ("add", ws1, "requires").parse_next(input)?;
    let roles = cut_err(role_list)
        .context(StrContext::Expected(StrContextValue::Description(
            "role list",
        )))
        .parse_next(input)?;
    Ok(TagConstraint::AddRequiresRole(roles))
}

fn remove_requires(input: &mut &str) -> ModalResult<TagConstraint> {
    ("remove", ws1, "requires").parse_next(input)?;
    let roles = cut_err(role_list)
        .context(StrContext::Expected(StrContextValue::Description(
            "role list",
        )))
        .parse_next(input)?;
    Ok(TagConstraint::RemoveRequiresRole(roles))
}

fn after_clause(input: &mut &str) -> ModalResult<TagConstraint> {
    "after".parse_next(input)?;
    let instant = cut_err(timestamp).parse_next(input)?;
    Ok(TagConstraint::Window(TimeWindow {
        not_before: Some(instant),
        not_after: None,
    }))
}

fn until_clause(input: &mut &str) -> ModalResult<TagConstraint> {
    "until".parse_next(input)?;
    let instant = cut_err(timestamp).parse_next(input)?;
    Ok(TagConstraint::Window(TimeWindow {
        not_before: None,
        not_after: Some(instant),
    }))
}

fn needs_group_clause(input: &mut &str) -> ModalResult<TagConstraint> {
    ("needs", ws1, "group", ws1).parse_next(input)?;
    let group = cut_err(name)
        .context(StrContext::Expected(StrContextValue::Description(
            "group name",
        )))
        .parse_next(input)?;
    Ok(TagConstraint::RequiresGroup(group))
}

fn needs_tags_clause(input: &mut &str) -> ModalResult<TagConstraint> {
    "needs".parse_next(input)?;
    let tags = cut_err(name_list)
        .context(StrContext::Expected(StrContextValue::Description(
            "tag list",
        )))
        .parse_next(input)?;
    Ok(TagConstraint::RequiresTags(tags.into_iter().collect()))
}

// -- Group clauses ----------------------------------------------------------

#[derive(Debug, Clone)]
enum GroupClause {
    Members(Vec<String>),
    Condition(GroupCondition),
}

fn group_clause(input: &mut &str) -> ModalResult<GroupClause> {
    ws.parse_next(input)?;
    alt((
        members_clause,
        "exclusive".value(GroupClause::Condition(GroupCondition::Exclusive)),
        at_clause,
        between_clause,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "group clause",
    )))
    .parse_next(input)
}

fn members_clause(input: &mut &str) -> ModalResult<GroupClause> {
    "members".parse_next(input)?;
    let members = cut_err(name_list)
        .context(StrContext::Expected(StrContextValue::Description(
            "member list",
        )))
        .parse_next(input)?;
    Ok(GroupClause::Members(members))
}

fn at_clause(input: &mut &str) -> ModalResult<GroupClause> {
    ("at", ws1).parse_next(input)?;
    let condition = cut_err(alt((
        preceded(("most", ws), dec_uint::<_, usize, _>).map(GroupCondition::AtMost),
        preceded(("least", ws), dec_uint::<_, usize, _>).map(GroupCondition::AtLeast),
    )))
    .context(StrContext::Expected(StrContextValue::Description(
        "'most N' or 'least N'",
    )))
    .parse_next(input)?;
    Ok(GroupClause::Condition(condition))
}

fn between_clause(input: &mut &str) -> ModalResult<GroupClause> {
    "between".parse_next(input)?;
    let (min, max) = cut_err((
        preceded(ws, dec_uint::<_, usize, _>),
        preceded((ws, "and", ws), dec_uint::<_, usize, _>),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "'between N and M'",
    )))
    .parse_next(input)?;
    Ok(GroupClause::Condition(GroupCondition::Between { min, max }))
}

// -- Definitions ------------------------------------------------------------

fn tag_def(input: &mut &str) -> ModalResult<TagRule> {
    ws.parse_next(input)?;
    "tag".parse_next(input)?;
    ws1.parse_next(input)?;
    let pattern = cut_err(name)
        .context(StrContext::Expected(StrContextValue::Description(
            "tag pattern",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('{').parse_next(input)?;
    let constraints: Vec<TagConstraint> = repeat(0.., tag_clause).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('}').parse_next(input)?;
    Ok(TagRule {
        pattern,
        constraints,
    })
}

fn group_def(input: &mut &str) -> ModalResult<TagGroup> {
    ws.parse_next(input)?;
    "group".parse_next(input)?;
    ws1.parse_next(input)?;
    let group_name = cut_err(name)
        .context(StrContext::Expected(StrContextValue::Description(
            "group name",
        )))
        .parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('{').parse_next(input)?;
    let clauses: Vec<GroupClause> = repeat(0.., group_clause).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('}').parse_next(input)?;

    let mut members = Vec::new();
    let mut condition = None;
    for clause in clauses {
        match clause {
            GroupClause::Members(m) => members.extend(m),
            GroupClause::Condition(c) => condition = Some(c),
        }
    }

    Ok(TagGroup {
        name: group_name,
        members,
        condition,
    })
}

#[derive(Debug)]
enum Item {
    Rule(TagRule),
    Group(TagGroup),
}

// -- Top-level parser -------------------------------------------------------

pub fn parse_policy(input: &mut &str) -> ModalResult<ParsedPolicy> {
    let items: Vec<Item> = repeat(
        0..,
        alt((tag_def.map(Item::Rule), group_def.map(Item::Group))),
    )
    .parse_next(input)?;

    ws.parse_next(input)?;

    let mut rules = Vec::new();
    let mut groups = Vec::new();
    for item in items {
        match item {
            Item::Rule(rule) => rules.push(rule),
            Item::Group(group) => groups.push(group),
        }
    }

    Ok(ParsedPolicy { rules, groups })
}
