//! Prefixed opaque IDs.
//!
//! IDs are minted by the relational store itself via
//! `'{prefix}-' || lower(hex(randomblob(4)))` default-value expressions (the
//! same convention the teacher's schema uses for every primary key), fetched
//! back with `RETURNING`, and wrapped here so call sites can't mix up which
//! kind of ID a `String` argument was supposed to be.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(DocId, "doc");
id_type!(VersionId, "ver");
id_type!(ChunkId, "chk");
id_type!(RunId, "run");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_string() {
        let id = ChunkId::from("chk-deadbeef");
        assert_eq!(id.as_str(), "chk-deadbeef");
        assert_eq!(id.to_string(), "chk-deadbeef");
    }

    #[test]
    fn prefixes_match_schema_convention() {
        assert_eq!(DocId::PREFIX, "doc");
        assert_eq!(VersionId::PREFIX, "ver");
        assert_eq!(ChunkId::PREFIX, "chk");
        assert_eq!(RunId::PREFIX, "run");
    }
}
