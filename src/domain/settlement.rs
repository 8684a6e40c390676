use super::ids::CourseId;
use serde::Serialize;

/// A course whose enrollment artifacts all exist after settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledCourse {
    pub course_id: CourseId,
    /// `true` when an earlier settlement had already produced every artifact.
    pub already_settled: bool,
}

/// A course that could not be settled despite a verified payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedCourse {
    pub course_id: CourseId,
    pub reason: String,
}

/// Per-course outcome of one settlement run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub settled: Vec<SettledCourse>,
    pub failed: Vec<FailedCourse>,
}

impl SettlementReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn settled_ids(&self) -> Vec<&CourseId> {
        self.settled.iter().map(|c| &c.course_id).collect()
    }

    pub fn failed_ids(&self) -> Vec<&CourseId> {
        self.failed.iter().map(|c| &c.course_id).collect()
    }

    pub fn is_settled(&self, course: &CourseId) -> bool {
        self.settled.iter().any(|c| &c.course_id == course)
    }
}
