use crate::{TagGroup, TagRule};

/// The result of parsing a policy DSL input string.
#[derive(Debug)]
pub struct ParsedPolicy {
    pub rules: Vec<TagRule>,
    pub groups: Vec<TagGroup>,
}
