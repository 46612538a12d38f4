mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::ParsedPolicy;

/// Parse a policy DSL input string into a [`ParsedPolicy`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid policy syntax.
pub fn parse(input: &str) -> Result<ParsedPolicy, ParseError> {
    use winnow::Parser;
    grammar::parse_policy
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
