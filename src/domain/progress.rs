use super::ids::{AccountId, CourseId, ProgressId};
use serde::{Deserialize, Serialize};

/// Tracks which content units an account has completed in one course.
///
/// Exactly one record exists per `(account, course)` pair.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: ProgressId,
    pub account: AccountId,
    pub course: CourseId,
    #[serde(default)]
    pub completed_units: Vec<String>,
}

impl ProgressRecord {
    pub fn new(id: ProgressId, account: AccountId, course: CourseId) -> Self {
        Self {
            id,
            account,
            course,
            completed_units: Vec::new(),
        }
    }

    /// Storage key enforcing the one-record-per-pair constraint.
    ///
    /// The account id is length-prefixed, so ids containing the separator
    /// still map to distinct keys.
    pub fn pair_key(account: &AccountId, course: &CourseId) -> String {
        format!("{}:{account}|{course}", account.as_str().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_is_unambiguous() {
        let left = ProgressRecord::pair_key(&"a|b".into(), &"c".into());
        let right = ProgressRecord::pair_key(&"a".into(), &"b|c".into());
        assert_ne!(left, right);
        assert_eq!(left, "3:a|b|c");
    }
}

/// Outcome of `ProgressStore::create_or_get`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpsert {
    pub record: ProgressRecord,
    /// `false` when the record already existed.
    pub created: bool,
}
