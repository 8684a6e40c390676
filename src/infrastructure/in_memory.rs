use crate::domain::account::Account;
use crate::domain::course::Course;
use crate::domain::ids::{AccountId, CourseId, ProgressId};
use crate::domain::ports::{AccountStore, CourseStore, ProgressStore, SetUpdate};
use crate::domain::progress::{ProgressRecord, ProgressUpsert};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory course catalog.
///
/// Conditional updates take the write lock for the whole check-and-insert, so
/// `add_student` behaves like a document store's set-union update.
#[derive(Default, Clone)]
pub struct InMemoryCourseStore {
    courses: Arc<RwLock<HashMap<CourseId, Course>>>,
}

impl InMemoryCourseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for InMemoryCourseStore {
    async fn put(&self, course: Course) -> Result<()> {
        let mut courses = self.courses.write().await;
        courses.insert(course.id.clone(), course);
        Ok(())
    }

    async fn get(&self, id: &CourseId) -> Result<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.get(id).cloned())
    }

    async fn add_student(&self, id: &CourseId, account: &AccountId) -> Result<Option<SetUpdate>> {
        let mut courses = self.courses.write().await;
        Ok(courses
            .get_mut(id)
            .map(|course| SetUpdate::from_changed(course.enroll(account))))
    }

    async fn remove(&self, id: &CourseId) -> Result<()> {
        let mut courses = self.courses.write().await;
        courses.remove(id);
        Ok(())
    }
}

/// A thread-safe in-memory account store.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn put(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(id).cloned())
    }

    async fn add_enrollment(
        &self,
        id: &AccountId,
        course: &CourseId,
        progress: &ProgressId,
    ) -> Result<Option<SetUpdate>> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .get_mut(id)
            .map(|account| SetUpdate::from_changed(account.add_enrollment(course, progress))))
    }
}

#[derive(Default)]
struct ProgressTable {
    records: HashMap<ProgressId, ProgressRecord>,
    by_pair: HashMap<(AccountId, CourseId), ProgressId>,
}

/// A thread-safe in-memory progress store with a unique `(account, course)` index.
#[derive(Default, Clone)]
pub struct InMemoryProgressStore {
    table: Arc<RwLock<ProgressTable>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records, across all accounts.
    pub async fn len(&self) -> usize {
        self.table.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn create_or_get(&self, account: &AccountId, course: &CourseId) -> Result<ProgressUpsert> {
        let key = (account.clone(), course.clone());
        let mut table = self.table.write().await;

        if let Some(existing) = table
            .by_pair
            .get(&key)
            .and_then(|id| table.records.get(id))
        {
            return Ok(ProgressUpsert {
                record: existing.clone(),
                created: false,
            });
        }

        let record = ProgressRecord::new(ProgressId::generate(), account.clone(), course.clone());
        table.by_pair.insert(key, record.id.clone());
        table.records.insert(record.id.clone(), record.clone());
        Ok(ProgressUpsert {
            record,
            created: true,
        })
    }

    async fn find(&self, account: &AccountId, course: &CourseId) -> Result<Option<ProgressRecord>> {
        let table = self.table.read().await;
        Ok(table
            .by_pair
            .get(&(account.clone(), course.clone()))
            .and_then(|id| table.records.get(id))
            .cloned())
    }

    async fn list_for_account(&self, account: &AccountId) -> Result<Vec<ProgressRecord>> {
        let table = self.table.read().await;
        Ok(table
            .records
            .values()
            .filter(|r| &r.account == account)
            .cloned()
            .collect())
    }
}
