use thiserror::Error;

/// Errors produced by order initiation, payment verification and settlement.
#[derive(Error, Debug)]
pub enum EnrollmentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Student is already enrolled in course {0}")]
    AlreadyEnrolled(String),
    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),
    #[error("Payment not completed: {0}")]
    PaymentNotComplete(String),
    #[error("Order {0} belongs to a different purchaser")]
    PurchaserMismatch(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Course vanished before settlement: {0}")]
    CourseVanished(String),
    #[error("Payment provider error: {0}")]
    Provider(String),
    #[error("Notification error: {0}")]
    Notification(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl EnrollmentError {
    pub fn course_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Course",
            id: id.to_string(),
        }
    }

    pub fn account_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "Account",
            id: id.to_string(),
        }
    }
}

impl From<reqwest::Error> for EnrollmentError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<serde_json::Error> for EnrollmentError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

impl From<csv::Error> for EnrollmentError {
    fn from(err: csv::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<std::io::Error> for EnrollmentError {
    fn from(err: std::io::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EnrollmentError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EnrollmentError>;
