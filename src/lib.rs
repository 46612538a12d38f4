mod compile;
mod error;
mod parse;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;
mod validate;

pub use error::TagwardError;
pub use parse::ParseError;
pub use types::{
    role_set, CompileError, ConditionReport, GroupBuilder, GroupCondition, GroupViolation,
    PatternError, RoleId, RoleSet, Tag, TagConfiguration, TagConfigurationBuilder, TagConstraint,
    TagDecision, TagError, TagGroup, TagPattern, TagRule, TagRuleBuilder, TagSet, TimeWindow,
};
