//! Purchase workflow orchestration.
//!
//! `checkout` prices a course set and opens a provider order, `verification`
//! confirms payment against the provider, `settlement` turns a verified order
//! into enrollment state and `notification` carries the best-effort mail.

pub mod checkout;
pub mod notification;
pub mod settlement;
pub mod verification;

use crate::domain::account::{Account, Role};
use crate::domain::ids::{AccountId, CourseId};
use crate::domain::ports::{AccountStore, AccountStoreRef};
use crate::error::{EnrollmentError, Result};
use tracing::warn;

/// Loads the purchaser and rejects accounts that are not students.
pub(crate) async fn require_student(accounts: &AccountStoreRef, purchaser: &AccountId) -> Result<Account> {
    let account = accounts
        .get(purchaser)
        .await?
        .ok_or_else(|| EnrollmentError::account_not_found(purchaser))?;
    if account.role != Role::Student {
        warn!(purchaser = %purchaser, role = ?account.role, "Payment route rejected for non-student");
        return Err(EnrollmentError::Forbidden(
            "Only students can purchase courses".to_string(),
        ));
    }
    Ok(account)
}

/// Drops repeated ids, keeping the first occurrence of each.
pub(crate) fn unique_course_ids(course_ids: &[CourseId]) -> Vec<CourseId> {
    let mut unique: Vec<CourseId> = Vec::with_capacity(course_ids.len());
    for id in course_ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryAccountStore;
    use std::sync::Arc;

    #[test]
    fn test_unique_course_ids_keeps_first_occurrence() {
        let ids: Vec<CourseId> = ["c2", "c1", "c2", "c3", "c1"]
            .into_iter()
            .map(CourseId::from)
            .collect();
        let unique = unique_course_ids(&ids);
        assert_eq!(
            unique,
            vec![CourseId::from("c2"), CourseId::from("c1"), CourseId::from("c3")]
        );
    }

    #[tokio::test]
    async fn test_require_student_checks_role() {
        let store = Arc::new(InMemoryAccountStore::new());
        store
            .put(Account::new("u1".into(), "u1@example.com", Role::Student))
            .await
            .unwrap();
        store
            .put(Account::new("i1".into(), "i1@example.com", Role::Instructor))
            .await
            .unwrap();
        store
            .put(Account::new("a1".into(), "a1@example.com", Role::Admin))
            .await
            .unwrap();
        let accounts: AccountStoreRef = store;

        assert!(require_student(&accounts, &"u1".into()).await.is_ok());
        for id in ["i1", "a1"] {
            let result = require_student(&accounts, &id.into()).await;
            assert!(matches!(result, Err(EnrollmentError::Forbidden(_))));
        }
        let missing = require_student(&accounts, &"ghost".into()).await;
        assert!(matches!(missing, Err(EnrollmentError::NotFound { entity: "Account", .. })));
    }
}
