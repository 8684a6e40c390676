use crate::domain::account::Account;
use crate::domain::course::Course;
use crate::domain::ids::{AccountId, CourseId, ProgressId};
use crate::domain::ports::{AccountStore, CourseStore, ProgressStore, SetUpdate};
use crate::domain::progress::{ProgressRecord, ProgressUpsert};
use crate::error::{EnrollmentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for course documents.
pub const CF_COURSES: &str = "courses";
/// Column Family for account documents.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for progress records, keyed by progress id.
pub const CF_PROGRESS: &str = "progress";
/// Column Family mapping the `(account, course)` pair key to a progress id.
pub const CF_PROGRESS_INDEX: &str = "progress_index";

/// A persistent store implementation using RocksDB.
///
/// Stores courses, accounts and progress records in separate Column Families.
/// RocksDB has no conditional document updates, so every read-modify-write goes
/// through `write_lock`; the set-semantics updates are atomic for the process
/// that owns the database.
///
/// `Clone` shares the underlying `Arc<DB>` and the lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_COURSES, CF_ACCOUNTS, CF_PROGRESS, CF_PROGRESS_INDEX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EnrollmentError::Storage(format!("Column family {name} not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                EnrollmentError::Storage(format!("Deserialization error in {cf_name}: {e}"))
            }),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(|e| {
            EnrollmentError::Storage(format!("Serialization error in {cf_name}: {e}"))
        })?;
        self.db.put_cf(cf, key.as_bytes(), bytes)?;
        Ok(())
    }
}

#[async_trait]
impl CourseStore for RocksDBStore {
    async fn put(&self, course: Course) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(CF_COURSES, course.id.as_str(), &course)
    }

    async fn get(&self, id: &CourseId) -> Result<Option<Course>> {
        self.read(CF_COURSES, id.as_str())
    }

    async fn add_student(&self, id: &CourseId, account: &AccountId) -> Result<Option<SetUpdate>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut course) = self.read::<Course>(CF_COURSES, id.as_str())? else {
            return Ok(None);
        };
        if !course.enroll(account) {
            return Ok(Some(SetUpdate::AlreadyPresent));
        }
        self.write(CF_COURSES, id.as_str(), &course)?;
        Ok(Some(SetUpdate::Added))
    }

    async fn remove(&self, id: &CourseId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_COURSES)?;
        self.db.delete_cf(cf, id.as_str().as_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn put(&self, account: Account) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(CF_ACCOUNTS, account.id.as_str(), &account)
    }

    async fn get(&self, id: &AccountId) -> Result<Option<Account>> {
        self.read(CF_ACCOUNTS, id.as_str())
    }

    async fn add_enrollment(
        &self,
        id: &AccountId,
        course: &CourseId,
        progress: &ProgressId,
    ) -> Result<Option<SetUpdate>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut account) = self.read::<Account>(CF_ACCOUNTS, id.as_str())? else {
            return Ok(None);
        };
        if !account.add_enrollment(course, progress) {
            return Ok(Some(SetUpdate::AlreadyPresent));
        }
        self.write(CF_ACCOUNTS, id.as_str(), &account)?;
        Ok(Some(SetUpdate::Added))
    }
}

#[async_trait]
impl ProgressStore for RocksDBStore {
    async fn create_or_get(&self, account: &AccountId, course: &CourseId) -> Result<ProgressUpsert> {
        let key = ProgressRecord::pair_key(account, course);
        let _guard = self.write_lock.lock().await;

        if let Some(id) = self.read::<ProgressId>(CF_PROGRESS_INDEX, &key)?
            && let Some(record) = self.read::<ProgressRecord>(CF_PROGRESS, id.as_str())?
        {
            return Ok(ProgressUpsert {
                record,
                created: false,
            });
        }

        let record = ProgressRecord::new(ProgressId::generate(), account.clone(), course.clone());
        // Record first, index second: a crash in between leaves an orphan record,
        // never an index entry pointing at nothing.
        self.write(CF_PROGRESS, record.id.as_str(), &record)?;
        self.write(CF_PROGRESS_INDEX, &key, &record.id)?;
        Ok(ProgressUpsert {
            record,
            created: true,
        })
    }

    async fn find(&self, account: &AccountId, course: &CourseId) -> Result<Option<ProgressRecord>> {
        let key = ProgressRecord::pair_key(account, course);
        match self.read::<ProgressId>(CF_PROGRESS_INDEX, &key)? {
            Some(id) => self.read(CF_PROGRESS, id.as_str()),
            None => Ok(None),
        }
    }

    async fn list_for_account(&self, account: &AccountId) -> Result<Vec<ProgressRecord>> {
        let cf = self.cf(CF_PROGRESS)?;
        let mut records = Vec::new();

        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let record: ProgressRecord = serde_json::from_slice(&value).map_err(|e| {
                EnrollmentError::Storage(format!("Failed to deserialize progress record: {e}"))
            })?;
            if &record.account == account {
                records.push(record);
            }
        }

        Ok(records)
    }
}
