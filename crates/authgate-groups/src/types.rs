//! Cached group-membership records.
//!
//! Group sets are always stored in canonical form (sorted, deduplicated) so
//! that set equality is order-independent and deterministic. The generic
//! deep-equality the cache decision relies on is plain `Vec<String>`
//! equality over canonical vectors.

use serde::{Deserialize, Serialize};

/// Returns the canonical form of a group set: sorted and deduplicated.
#[must_use]
pub fn canonicalize(groups: &[String]) -> Vec<String> {
    let mut canonical = groups.to_vec();
    canonical.sort();
    canonical.dedup();
    canonical
}

/// Group sets recorded for a single identity at validation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupData {
    /// The caller-supplied groups considered authoritative for the request.
    pub allowed_groups: Vec<String>,

    /// The subset of `allowed_groups` the identity actually holds, per the
    /// upstream provider. May be empty; an empty set is stored but never
    /// treated as a usable hit.
    pub matched_groups: Vec<String>,
}

impl UserGroupData {
    /// Builds a record with both group sets in canonical form.
    #[must_use]
    pub fn canonical(allowed_groups: &[String], matched_groups: &[String]) -> Self {
        Self {
            allowed_groups: canonicalize(allowed_groups),
            matched_groups: canonicalize(matched_groups),
        }
    }
}

/// A keyed cache record: the identity plus its group data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The identity this record belongs to.
    pub key: String,

    /// Group sets observed for the identity.
    pub data: UserGroupData,
}

impl Entry {
    /// Creates an entry, canonicalizing both group sets.
    #[must_use]
    pub fn new(key: impl Into<String>, allowed_groups: &[String], matched_groups: &[String]) -> Self {
        Self {
            key: key.into(),
            data: UserGroupData::canonical(allowed_groups, matched_groups),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn canonicalize_sorts_and_dedups() {
        let raw = groups(&["ops", "eng", "ops", "admin"]);
        assert_eq!(canonicalize(&raw), groups(&["admin", "eng", "ops"]));
    }

    #[test]
    fn canonical_records_compare_order_independently() {
        let a = UserGroupData::canonical(&groups(&["eng", "ops"]), &groups(&["eng"]));
        let b = UserGroupData::canonical(&groups(&["ops", "eng"]), &groups(&["eng"]));
        assert_eq!(a, b);
    }

    #[test]
    fn entry_new_canonicalizes() {
        let entry = Entry::new("u@x.com", &groups(&["ops", "eng"]), &groups(&["ops", "eng"]));
        assert_eq!(entry.data.allowed_groups, groups(&["eng", "ops"]));
        assert_eq!(entry.data.matched_groups, groups(&["eng", "ops"]));
    }
}
