mod config;
mod decision;
mod error;
mod group;
mod pattern;
mod role;
mod rule;
mod tag;

pub use config::{GroupBuilder, TagConfiguration, TagConfigurationBuilder, TagRuleBuilder};
pub use decision::{ConditionReport, GroupViolation, TagDecision};
pub use error::CompileError;
pub use group::{GroupCondition, TagGroup};
pub use pattern::{PatternError, TagPattern};
pub use role::{role_set, RoleId, RoleSet};
pub use rule::{TagConstraint, TagRule, TimeWindow};
pub use tag::{Tag, TagError, TagSet};

pub(crate) use group::CompiledGroup;
pub(crate) use rule::{CompiledConstraint, CompiledTagRule};
