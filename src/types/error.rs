use thiserror::Error;

use super::pattern::PatternError;
use super::tag::TagError;

/// Errors reported when compiling a tag configuration.
///
/// Every malformed-configuration condition is caught here, at construction
/// time; validation itself never fails.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("duplicate tag rule for pattern '{pattern}'")]
    DuplicateRule { pattern: String },

    #[error("duplicate tag group '{name}'")]
    DuplicateGroup { name: String },

    #[error("invalid tag pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: PatternError,
    },

    #[error("tag rule '{pattern}' has no constraints")]
    EmptyRule { pattern: String },

    #[error("role requirement on '{pattern}' lists no roles")]
    EmptyRoleList { pattern: String },

    #[error("required-tag list on '{pattern}' is empty")]
    EmptyTagList { pattern: String },

    #[error("invalid required tag on '{pattern}': {source}")]
    InvalidRequiredTag { pattern: String, source: TagError },

    #[error("window on '{pattern}' ends before it starts")]
    InvalidWindow { pattern: String },

    #[error("tag rule '{pattern}' references undefined group '{group}'")]
    UndefinedGroup { pattern: String, group: String },

    #[error("tag group '{group}' has no members")]
    EmptyGroup { group: String },

    #[error("tag group '{group}' has no condition")]
    MissingCondition { group: String },

    #[error("tag group '{group}' bounds are inverted: min {min} > max {max}")]
    InvalidGroupBounds {
        group: String,
        min: usize,
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_rule_message() {
        let err = CompileError::DuplicateRule {
            pattern: "locked".into(),
        };
        assert_eq!(err.to_string(), "duplicate tag rule for pattern 'locked'");
    }

    #[test]
    fn invalid_pattern_message() {
        let err = CompileError::InvalidPattern {
            pattern: "a**".into(),
            source: PatternError::AdjacentWildcards,
        };
        assert_eq!(
            err.to_string(),
            "invalid tag pattern 'a**': pattern contains adjacent wildcards"
        );
    }

    #[test]
    fn undefined_group_message() {
        let err = CompileError::UndefinedGroup {
            pattern: "event-*".into(),
            group: "seasons".into(),
        };
        assert_eq!(
            err.to_string(),
            "tag rule 'event-*' references undefined group 'seasons'"
        );
    }

    #[test]
    fn missing_condition_message() {
        let err = CompileError::MissingCondition {
            group: "colors".into(),
        };
        assert_eq!(err.to_string(), "tag group 'colors' has no condition");
    }

    #[test]
    fn inverted_bounds_message() {
        let err = CompileError::InvalidGroupBounds {
            group: "colors".into(),
            min: 3,
            max: 1,
        };
        assert_eq!(
            err.to_string(),
            "tag group 'colors' bounds are inverted: min 3 > max 1"
        );
    }

    #[test]
    fn invalid_required_tag_message() {
        let err = CompileError::InvalidRequiredTag {
            pattern: "event".into(),
            source: TagError::Empty,
        };
        assert_eq!(
            err.to_string(),
            "invalid required tag on 'event': tag is empty"
        );
    }
}
