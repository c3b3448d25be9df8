use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a Question
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

/// Unique identifier for a quiz Session
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

/// Unique identifier for an Answer
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnswerId(u64);

macro_rules! id_impls {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Creates a new identifier from its raw value
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: $label,
                })
            }
        }
    };
}

id_impls!(QuestionId, "QuestionId");
id_impls!(SessionId, "SessionId");
id_impls!(AnswerId, "AnswerId");

/// Error type for parsing an identifier from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_display_and_parse() {
        let id = QuestionId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<QuestionId>().unwrap(), id);
    }

    #[test]
    fn session_id_rejects_garbage() {
        let result = "not-a-number".parse::<SessionId>();
        assert!(result.is_err());
    }

    #[test]
    fn answer_id_debug_names_the_type() {
        let id = AnswerId::new(7);
        assert_eq!(format!("{id:?}"), "AnswerId(7)");
    }

    #[test]
    fn id_roundtrip() {
        let original = SessionId::new(99);
        let parsed: SessionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }
}
