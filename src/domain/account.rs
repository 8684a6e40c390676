use super::ids::{AccountId, CourseId, ProgressId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub enum Role {
    #[default]
    Student,
    Instructor,
    Admin,
}

/// A learner, instructor or admin identity.
///
/// `courses` and `course_progress` are owned by enrollment settlement: they only
/// grow through `add_enrollment`, which never inserts a duplicate.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub courses: Vec<CourseId>,
    #[serde(default)]
    pub course_progress: Vec<ProgressId>,
}

impl Account {
    pub fn new(id: AccountId, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            courses: Vec::new(),
            course_progress: Vec::new(),
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn is_enrolled_in(&self, course: &CourseId) -> bool {
        self.courses.contains(course)
    }

    /// Adds the course and its progress record if the course is not listed yet.
    ///
    /// Returns `true` when the account changed.
    pub fn add_enrollment(&mut self, course: &CourseId, progress: &ProgressId) -> bool {
        let mut changed = false;
        if !self.courses.contains(course) {
            self.courses.push(course.clone());
            changed = true;
        }
        if !self.course_progress.contains(progress) {
            self.course_progress.push(progress.clone());
            changed = true;
        }
        changed
    }

    /// Name used in greetings; falls back to the email when no name is on file.
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.email
        } else {
            &self.first_name
        }
    }
}
