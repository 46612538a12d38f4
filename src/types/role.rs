use std::collections::HashSet;
use std::fmt;

/// An opaque role identifier held by the acting user.
///
/// The engine never interprets role values; it only tests membership against
/// the role requirements a configuration declares. Resolving which roles a
/// user holds belongs to the surrounding authorization subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoleId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RoleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for RoleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of roles the acting user holds at validation time.
pub type RoleSet = HashSet<RoleId>;

/// Build a [`RoleSet`] from anything yielding role names.
pub fn role_set<I, S>(roles: I) -> RoleSet
where
    I: IntoIterator<Item = S>,
    S: Into<RoleId>,
{
    roles.into_iter().map(Into::into).collect()
}
