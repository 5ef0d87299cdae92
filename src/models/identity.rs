//! Composite bucket identity and its persisted token form.
//!
//! A bucket is addressed remotely by `(zone, label)`. The orchestration
//! layer stores a single opaque string instead, `"<zone>:<label>"`, so the
//! separator is reserved and may not appear inside either field.
//!
//! Both fields become URL path segments on the remote, so they are limited
//! to the remote's label alphabet: lowercase ASCII letters, digits, `-` and
//! `.`, starting with a letter or digit.

use std::{fmt, str::FromStr};

use crate::errors::{ReconcileError, ReconcileResult};

/// Reserved separator between zone and label in an identity token.
pub const SEPARATOR: char = ':';

/// Remote identity of a bucket. Immutable once the bucket exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    /// Region/cluster the bucket lives in (e.g. "us-east").
    pub zone: String,

    /// Bucket label, unique within its zone.
    pub label: String,
}

impl ResourceIdentity {
    pub fn new(zone: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            label: label.into(),
        }
    }

    /// Validate both fields without building the token.
    pub fn validate(&self) -> ReconcileResult<()> {
        check_part(self, &self.zone)?;
        check_part(self, &self.label)
    }
}

/// Longest zone or label accepted.
const MAX_PART_LEN: usize = 63;

fn part_violation(part: &str) -> Option<&'static str> {
    if part.is_empty() {
        Some("zone and label must not be empty")
    } else if part.contains(SEPARATOR) {
        Some("zone and label must not contain `:`")
    } else if part.len() > MAX_PART_LEN {
        Some("zone and label must be at most 63 characters")
    } else if !part
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        Some("zone and label may only contain lowercase letters, digits, `-` and `.`")
    } else if !part.as_bytes()[0].is_ascii_alphanumeric() {
        Some("zone and label must start with a letter or digit")
    } else {
        None
    }
}

fn check_part(identity: &ResourceIdentity, part: &str) -> ReconcileResult<()> {
    match part_violation(part) {
        None => Ok(()),
        Some(reason) => Err(ReconcileError::InvalidIdentity {
            zone: identity.zone.clone(),
            label: identity.label.clone(),
            reason,
        }),
    }
}

/// Encode an identity into its persisted token.
pub fn encode_identity(identity: &ResourceIdentity) -> ReconcileResult<String> {
    identity.validate()?;
    Ok(format!("{}{}{}", identity.zone, SEPARATOR, identity.label))
}

/// Decode a persisted token. Exactly one separator and two well-formed parts.
pub fn decode_identity(token: &str) -> ReconcileResult<ResourceIdentity> {
    let parts: Vec<&str> = token.split(SEPARATOR).collect();
    match parts.as_slice() {
        [zone, label] if part_violation(zone).is_none() && part_violation(label).is_none() => {
            Ok(ResourceIdentity::new(*zone, *label))
        }
        _ => Err(ReconcileError::MalformedIdentity(token.to_string())),
    }
}

impl FromStr for ResourceIdentity {
    type Err = ReconcileError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        decode_identity(token)
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.zone, SEPARATOR, self.label)
    }
}
