//! Which destination lists belong to a source type.
//!
//! There is no foreign key between a list and a type: membership is derived
//! from the list label. Two rules are supported:
//!
//! - [`MembershipRule::Prefix`]: `label.starts_with(type)`. This is the
//!   historical contract. A type that is a prefix of another type
//!   (`"Server"` vs `"ServerRack"`) claims the other type's lists too.
//! - [`MembershipRule::Delimited`]: `label == type` or
//!   `label.starts_with(type + "-")`. Narrower, still fragile for type names
//!   that themselves end in `-<n>`.
//!
//! Ambiguous matches are reported by the engine under either rule.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRule {
    #[default]
    Prefix,
    Delimited,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMembershipRule(pub String);

impl std::fmt::Display for UnknownMembershipRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown membership rule '{}'; expected one of: prefix | delimited",
            self.0
        )
    }
}

impl std::error::Error for UnknownMembershipRule {}

impl MembershipRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRule::Prefix => "prefix",
            MembershipRule::Delimited => "delimited",
        }
    }

    pub fn belongs(&self, label: &str, type_name: &str) -> bool {
        match self {
            MembershipRule::Prefix => label.starts_with(type_name),
            MembershipRule::Delimited => match label.strip_prefix(type_name) {
                Some(rest) => rest.is_empty() || rest.starts_with('-'),
                None => false,
            },
        }
    }
}

impl std::str::FromStr for MembershipRule {
    type Err = UnknownMembershipRule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(MembershipRule::Prefix),
            "delimited" => Ok(MembershipRule::Delimited),
            other => Err(UnknownMembershipRule(other.to_string())),
        }
    }
}
