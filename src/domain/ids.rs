use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a learner, instructor or admin account.
    AccountId
);
string_id!(
    /// Identifier of a catalog course.
    CourseId
);
string_id!(
    /// Identifier of a progress record.
    ProgressId
);

impl ProgressId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = CourseId::from("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");

        let parsed: AccountId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(parsed.as_str(), "u1");
    }

    #[test]
    fn test_generated_progress_ids_are_unique() {
        assert_ne!(ProgressId::generate(), ProgressId::generate());
    }
}
