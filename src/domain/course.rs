use super::ids::{AccountId, CourseId};
use super::money::Price;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
}

/// A catalog course.
///
/// `students_enrolled` is a set: `enroll` is the only way this crate writes it
/// and it never pushes a duplicate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub price: Price,
    pub status: CourseStatus,
    #[serde(default)]
    pub students_enrolled: Vec<AccountId>,
}

impl Course {
    pub fn new(id: CourseId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            status: CourseStatus::Published,
            students_enrolled: Vec::new(),
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == CourseStatus::Published
    }

    pub fn has_student(&self, account: &AccountId) -> bool {
        self.students_enrolled.contains(account)
    }

    /// Adds the student if absent. Returns `true` when the set grew.
    pub fn enroll(&mut self, account: &AccountId) -> bool {
        if self.has_student(account) {
            false
        } else {
            self.students_enrolled.push(account.clone());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_enroll_never_duplicates() {
        let mut course = Course::new("c1".into(), "Rust 101", Price::new(dec!(100)).unwrap());
        let student = AccountId::from("u1");

        assert!(course.enroll(&student));
        assert!(!course.enroll(&student));
        assert_eq!(course.students_enrolled.len(), 1);
        assert!(course.has_student(&student));
    }

    #[test]
    fn test_new_course_is_published() {
        let course = Course::new("c1".into(), "Rust 101", Price::ZERO);
        assert!(course.is_published());
    }
}
