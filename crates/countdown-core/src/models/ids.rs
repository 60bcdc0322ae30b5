//! Identifier newtypes
//!
//! The server hands out integer ids, but every comparison on the client is a
//! string comparison, so both JSON numbers and strings are accepted.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Number(i64),
                    Text(String),
                }

                Ok(match Raw::deserialize(deserializer)? {
                    Raw::Number(n) => Self(n.to_string()),
                    Raw::Text(s) => Self(s),
                })
            }
        }
    };
}

string_id!(
    /// Timer identifier, scoped within a project.
    TimerId
);

string_id!(
    /// Project identifier.
    ProjectId
);
