use crate::domain::account::{Account, Role};
use crate::domain::course::{Course, CourseStatus};
use crate::domain::ids::{AccountId, CourseId};
use crate::domain::money::Price;
use crate::domain::ports::{AccountStore, CourseStore};
use crate::error::{EnrollmentError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::io::Read;
use tracing::info;

/// One catalog row: `id, name, price[, status]`.
#[derive(Debug, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub status: Option<String>,
}

impl TryFrom<CourseRow> for Course {
    type Error = EnrollmentError;

    fn try_from(row: CourseRow) -> Result<Self> {
        let mut course = Course::new(CourseId::new(row.id), row.name, row.price);
        course.status = match row.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("published") => CourseStatus::Published,
            Some("draft") => CourseStatus::Draft,
            Some(other) => {
                return Err(EnrollmentError::InvalidInput(format!(
                    "Unknown course status '{other}' for course {}",
                    course.id
                )));
            }
        };
        Ok(course)
    }
}

/// One account row: `id, email[, first_name, last_name, role]`.
#[derive(Debug, Deserialize)]
pub struct AccountRow {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = EnrollmentError;

    fn try_from(row: AccountRow) -> Result<Self> {
        if !row.email.contains('@') {
            return Err(EnrollmentError::InvalidInput(format!(
                "Account {} has an invalid email",
                row.id
            )));
        }
        let role = match row.role.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("") | Some("student") => Role::Student,
            Some("instructor") => Role::Instructor,
            Some("admin") => Role::Admin,
            Some(other) => {
                return Err(EnrollmentError::InvalidInput(format!(
                    "Unknown role '{other}' for account {}",
                    row.id
                )));
            }
        };
        Ok(Account::new(AccountId::new(row.id), row.email, role)
            .with_name(row.first_name, row.last_name))
    }
}

/// Reads seed rows from a CSV source.
///
/// Whitespace around fields is trimmed and short rows are accepted so optional
/// trailing columns can be left out.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    fn rows<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EnrollmentError::from))
    }

    pub fn courses(self) -> impl Iterator<Item = Result<Course>> {
        self.rows::<CourseRow>()
            .map(|row| row.and_then(Course::try_from))
    }

    pub fn accounts(self) -> impl Iterator<Item = Result<Account>> {
        self.rows::<AccountRow>()
            .map(|row| row.and_then(Account::try_from))
    }
}

/// Loads every course row into `store`, stopping at the first bad row.
pub async fn seed_courses<R: Read>(reader: CatalogReader<R>, store: &dyn CourseStore) -> Result<usize> {
    let mut count = 0;
    for course in reader.courses() {
        store.put(course?).await?;
        count += 1;
    }
    info!(count, "Courses seeded");
    Ok(count)
}

/// Loads every account row into `store`, stopping at the first bad row.
pub async fn seed_accounts<R: Read>(reader: CatalogReader<R>, store: &dyn AccountStore) -> Result<usize> {
    let mut count = 0;
    for account in reader.accounts() {
        store.put(account?).await?;
        count += 1;
    }
    info!(count, "Accounts seeded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryCourseStore;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_courses() {
        let data = "id, name, price, status\nc1, Rust 101, 100, published\nc2, Async Rust, 249.50, Draft\nc3, Intro, 0";
        let courses: Vec<Result<Course>> = CatalogReader::new(data.as_bytes()).courses().collect();

        assert_eq!(courses.len(), 3);
        let c2 = courses[1].as_ref().unwrap();
        assert_eq!(c2.price, Price::new(dec!(249.50)).unwrap());
        assert_eq!(c2.status, CourseStatus::Draft);
        assert!(courses[2].as_ref().unwrap().is_published());
    }

    #[test]
    fn test_reader_rejects_negative_price_and_unknown_status() {
        let data = "id, name, price, status\nc1, Rust 101, -5, published\nc2, B, 10, archived";
        let courses: Vec<Result<Course>> = CatalogReader::new(data.as_bytes()).courses().collect();
        assert!(courses[0].is_err());
        assert!(matches!(courses[1], Err(EnrollmentError::InvalidInput(_))));
    }

    #[test]
    fn test_reader_accounts() {
        let data = "id, email, first_name, last_name, role\nu1, asha@example.com, Asha, Rao, student\nu2, ravi@example.com, Ravi, , Instructor\nu3, nobody";
        let accounts: Vec<Result<Account>> = CatalogReader::new(data.as_bytes()).accounts().collect();

        let u1 = accounts[0].as_ref().unwrap();
        assert_eq!(u1.display_name(), "Asha");
        assert_eq!(accounts[1].as_ref().unwrap().role, Role::Instructor);
        assert!(accounts[2].is_err());
    }

    #[tokio::test]
    async fn test_seed_courses_into_store() {
        let store = InMemoryCourseStore::new();
        let data = "id,name,price\nc1,Rust 101,100\nc2,Async Rust,200";
        let count = seed_courses(CatalogReader::new(data.as_bytes()), &store).await.unwrap();
        assert_eq!(count, 2);
        assert!(store.get(&"c2".into()).await.unwrap().is_some());
    }
}
