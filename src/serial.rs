//! Binary serialization and deserialization of compiled tag configurations.
//!
//! This module provides a stable binary format for persisting compiled
//! [`TagConfiguration`](crate::TagConfiguration) values, so a site's policy
//! can be cached and reloaded without re-parsing the DSL. The format consists
//! of a 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"TAGW"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! The payload stores the policy at the source level (patterns as text,
//! group references by name); decoding re-runs full compilation, so a decoded
//! configuration satisfies every construction-time invariant or fails with
//! [`DeserializeError::Validation`].
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with
//! [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::types::{CompiledConstraint, CompiledGroup, CompiledTagRule};
use crate::{
    GroupCondition, RoleId, TagConfiguration, TagConstraint, TagGroup, TagRule, TimeWindow,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"TAGW";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a
/// [`TagConfiguration`](crate::TagConfiguration) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a
/// [`TagConfiguration`](crate::TagConfiguration) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a tagward binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedPolicy {
    metadata: PolicyMetadata,
    rules: Vec<SerializedRule>,
    groups: Vec<SerializedGroup>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyMetadata {
    rule_count: usize,
    group_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedRule {
    pattern: String,
    constraints: Vec<SerializedConstraint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedConstraint {
    Forbidden,
    AddRequiresRole(Vec<String>),
    RemoveRequiresRole(Vec<String>),
    Privileged,
    /// Unix timestamps in nanoseconds.
    Window {
        not_before: Option<i128>,
        not_after: Option<i128>,
    },
    RequiresTags(Vec<String>),
    RequiresGroup(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedGroup {
    name: String,
    members: Vec<String>,
    condition: SerializedCondition,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum SerializedCondition {
    Exclusive,
    AtMost(u64),
    AtLeast(u64),
    Between { min: u64, max: u64 },
}

// ---------------------------------------------------------------------------
// Condition conversion
// ---------------------------------------------------------------------------

#[allow(clippy::cast_possible_truncation)] // counts are tens, not 2^64
fn serialize_condition(condition: GroupCondition) -> SerializedCondition {
    match condition {
        GroupCondition::Exclusive => SerializedCondition::Exclusive,
        GroupCondition::AtMost(max) => SerializedCondition::AtMost(max as u64),
        GroupCondition::AtLeast(min) => SerializedCondition::AtLeast(min as u64),
        GroupCondition::Between { min, max } => SerializedCondition::Between {
            min: min as u64,
            max: max as u64,
        },
    }
}

fn deserialize_condition(condition: SerializedCondition) -> Result<GroupCondition, DeserializeError> {
    let bound = |value: u64| {
        usize::try_from(value).map_err(|_| {
            DeserializeError::Validation(format!("group bound {value} exceeds platform limits"))
        })
    };
    Ok(match condition {
        SerializedCondition::Exclusive => GroupCondition::Exclusive,
        SerializedCondition::AtMost(max) => GroupCondition::AtMost(bound(max)?),
        SerializedCondition::AtLeast(min) => GroupCondition::AtLeast(bound(min)?),
        SerializedCondition::Between { min, max } => GroupCondition::Between {
            min: bound(min)?,
            max: bound(max)?,
        },
    })
}

// ---------------------------------------------------------------------------
// Constraint conversion
// ---------------------------------------------------------------------------

fn serialize_constraint(
    constraint: &CompiledConstraint,
    groups: &[CompiledGroup],
) -> SerializedConstraint {
    match constraint {
        CompiledConstraint::Forbidden => SerializedConstraint::Forbidden,
        CompiledConstraint::Privileged => SerializedConstraint::Privileged,
        CompiledConstraint::AddRequiresRole(roles) => SerializedConstraint::AddRequiresRole(
            roles.iter().map(|r| r.as_str().to_owned()).collect(),
        ),
        CompiledConstraint::RemoveRequiresRole(roles) => SerializedConstraint::RemoveRequiresRole(
            roles.iter().map(|r| r.as_str().to_owned()).collect(),
        ),
        CompiledConstraint::Window(window) => SerializedConstraint::Window {
            not_before: window.not_before.map(OffsetDateTime::unix_timestamp_nanos),
            not_after: window.not_after.map(OffsetDateTime::unix_timestamp_nanos),
        },
        CompiledConstraint::RequiresTags(tags) => {
            SerializedConstraint::RequiresTags(tags.iter().map(|t| t.as_str().to_owned()).collect())
        }
        CompiledConstraint::RequiresGroup(idx) => {
            SerializedConstraint::RequiresGroup(groups[*idx].name.clone())
        }
    }
}

fn deserialize_constraint(
    constraint: SerializedConstraint,
) -> Result<TagConstraint, DeserializeError> {
    let instant = |nanos: i128| {
        OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| {
            DeserializeError::Validation(format!("timestamp {nanos} is out of range"))
        })
    };
    Ok(match constraint {
        SerializedConstraint::Forbidden => TagConstraint::Forbidden,
        SerializedConstraint::Privileged => TagConstraint::Privileged,
        SerializedConstraint::AddRequiresRole(roles) => {
            TagConstraint::AddRequiresRole(roles.into_iter().map(RoleId::from).collect())
        }
        SerializedConstraint::RemoveRequiresRole(roles) => {
            TagConstraint::RemoveRequiresRole(roles.into_iter().map(RoleId::from).collect())
        }
        SerializedConstraint::Window {
            not_before,
            not_after,
        } => TagConstraint::Window(TimeWindow {
            not_before: not_before.map(instant).transpose()?,
            not_after: not_after.map(instant).transpose()?,
        }),
        SerializedConstraint::RequiresTags(tags) => {
            TagConstraint::RequiresTags(tags.into_iter().collect::<BTreeSet<String>>())
        }
        SerializedConstraint::RequiresGroup(name) => TagConstraint::RequiresGroup(name),
    })
}

// ---------------------------------------------------------------------------
// TagConfiguration -> SerializedPolicy
// ---------------------------------------------------------------------------

fn config_to_serialized(config: &TagConfiguration, source_text: Option<&str>) -> SerializedPolicy {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());

    let rules: Vec<SerializedRule> = config
        .rules
        .iter()
        .map(|rule: &CompiledTagRule| SerializedRule {
            pattern: rule.pattern.source().to_owned(),
            constraints: rule
                .constraints
                .iter()
                .map(|c| serialize_constraint(c, &config.groups))
                .collect(),
        })
        .collect();

    let groups: Vec<SerializedGroup> = config
        .groups
        .iter()
        .map(|group| SerializedGroup {
            name: group.name.clone(),
            members: group.members.iter().map(|m| m.source().to_owned()).collect(),
            condition: serialize_condition(group.condition),
        })
        .collect();

    SerializedPolicy {
        metadata: PolicyMetadata {
            rule_count: rules.len(),
            group_count: groups.len(),
            source_digest,
        },
        rules,
        groups,
    }
}

// ---------------------------------------------------------------------------
// SerializedPolicy -> TagConfiguration
// ---------------------------------------------------------------------------

fn serialized_to_config(ser: SerializedPolicy) -> Result<TagConfiguration, DeserializeError> {
    if ser.metadata.rule_count != ser.rules.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} rules but payload has {}",
            ser.metadata.rule_count,
            ser.rules.len()
        )));
    }
    if ser.metadata.group_count != ser.groups.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} groups but payload has {}",
            ser.metadata.group_count,
            ser.groups.len()
        )));
    }

    let rules: Vec<TagRule> = ser
        .rules
        .into_iter()
        .map(|rule| {
            let constraints = rule
                .constraints
                .into_iter()
                .map(deserialize_constraint)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TagRule {
                pattern: rule.pattern,
                constraints,
            })
        })
        .collect::<Result<_, DeserializeError>>()?;

    let groups: Vec<TagGroup> = ser
        .groups
        .into_iter()
        .map(|group| {
            Ok(TagGroup {
                name: group.name,
                members: group.members,
                condition: Some(deserialize_condition(group.condition)?),
            })
        })
        .collect::<Result<_, DeserializeError>>()?;

    // Decoded policies go through full compilation, so a tampered payload
    // cannot smuggle in a configuration the builder would reject.
    crate::compile::compile(&rules, &groups)
        .map_err(|e| DeserializeError::Validation(e.to_string()))
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    config: &TagConfiguration,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let serialized = config_to_serialized(config, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<TagConfiguration, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedPolicy, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_config(serialized)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
