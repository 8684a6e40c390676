use super::notification::{Notification, Notifier};
use super::unique_course_ids;
use crate::domain::account::Account;
use crate::domain::ids::{AccountId, CourseId};
use crate::domain::ports::{AccountStoreRef, CourseStoreRef, ProgressStoreRef, SetUpdate};
use crate::domain::settlement::{FailedCourse, SettledCourse, SettlementReport};
use crate::error::{EnrollmentError, Result};
use futures::future::join_all;
use tracing::{debug, error, info};

/// Turns a verified course set into durable enrollment state.
///
/// Every course is settled independently with add-if-absent store updates, so
/// retries and concurrent runs for the same `(purchaser, course)` converge on
/// one membership entry and one progress record. A course that fails is
/// reported in [`SettlementReport::failed`] without affecting its siblings.
pub struct EnrollmentSettlement {
    courses: CourseStoreRef,
    accounts: AccountStoreRef,
    progress: ProgressStoreRef,
    notifier: Notifier,
}

impl EnrollmentSettlement {
    pub fn new(
        courses: CourseStoreRef,
        accounts: AccountStoreRef,
        progress: ProgressStoreRef,
        notifier: Notifier,
    ) -> Self {
        Self {
            courses,
            accounts,
            progress,
            notifier,
        }
    }

    /// Settles every course in `course_ids` for `purchaser`.
    ///
    /// Fails as a whole only when the purchaser account does not exist; all
    /// per-course problems land in the report.
    pub async fn settle(
        &self,
        purchaser: &AccountId,
        course_ids: &[CourseId],
    ) -> Result<SettlementReport> {
        let account = self
            .accounts
            .get(purchaser)
            .await?
            .ok_or_else(|| EnrollmentError::account_not_found(purchaser))?;

        let course_ids = unique_course_ids(course_ids);
        let outcomes = join_all(
            course_ids
                .iter()
                .map(|course_id| self.settle_course(&account, course_id)),
        )
        .await;

        let mut report = SettlementReport::default();
        for (course_id, outcome) in course_ids.into_iter().zip(outcomes) {
            match outcome {
                Ok(already_settled) => report.settled.push(SettledCourse {
                    course_id,
                    already_settled,
                }),
                Err(e) => {
                    error!(purchaser = %purchaser, course_id = %course_id, error = %e, "Course settlement failed");
                    report.failed.push(FailedCourse {
                        course_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            purchaser = %purchaser,
            settled = report.settled.len(),
            failed = report.failed.len(),
            "Settlement finished"
        );
        Ok(report)
    }

    /// Runs the ordered steps for one course. Returns `true` when nothing changed.
    async fn settle_course(&self, account: &Account, course_id: &CourseId) -> Result<bool> {
        let membership = self
            .courses
            .add_student(course_id, &account.id)
            .await?
            .ok_or_else(|| EnrollmentError::CourseVanished(course_id.to_string()))?;

        let progress = self.progress.create_or_get(&account.id, course_id).await?;

        let enrollment = self
            .accounts
            .add_enrollment(&account.id, course_id, &progress.record.id)
            .await?
            .ok_or_else(|| EnrollmentError::account_not_found(&account.id))?;

        let already_settled = membership == SetUpdate::AlreadyPresent
            && !progress.created
            && enrollment == SetUpdate::AlreadyPresent;

        if already_settled {
            debug!(purchaser = %account.id, course_id = %course_id, "Course already settled");
        } else {
            info!(purchaser = %account.id, course_id = %course_id, progress_id = %progress.record.id, "Course settled");
        }
        // Exactly one run creates the progress record, even under races.
        if progress.created {
            self.notify_enrolled(account, course_id).await;
        }
        Ok(already_settled)
    }

    async fn notify_enrolled(&self, account: &Account, course_id: &CourseId) {
        let course_name = match self.courses.get(course_id).await {
            Ok(Some(course)) => course.name,
            _ => course_id.to_string(),
        };
        self.notifier.enqueue(Notification::Enrolled {
            to: account.email.clone(),
            name: account.display_name().to_string(),
            course_name,
        });
    }
}
