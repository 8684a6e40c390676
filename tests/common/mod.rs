#![allow(dead_code)]

use async_trait::async_trait;
use coursepay::bootstrap::{Stores, build_state};
use coursepay::config::Settings;
use coursepay::domain::account::{Account, Role};
use coursepay::domain::course::Course;
use coursepay::domain::ids::{AccountId, CourseId};
use coursepay::domain::money::Price;
use coursepay::domain::ports::{AccountStore, CourseStore, MailSender};
use coursepay::error::{EnrollmentError, Result};
use coursepay::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryCourseStore, InMemoryProgressStore,
};
use coursepay::infrastructure::providers::SandboxProvider;
use coursepay::interfaces::http::AppState;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const SANDBOX_SECRET: &str = "test_sandbox_secret";
pub const TOKEN_SECRET: &str = "test_token_secret";

/// Mail sender that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        if self.fail {
            return Err(EnrollmentError::Notification("mail provider down".to_string()));
        }
        Ok(())
    }
}

/// In-memory stores, sandbox provider and recording mailer wired like the binary.
pub struct Harness {
    pub courses: Arc<InMemoryCourseStore>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub progress: Arc<InMemoryProgressStore>,
    pub provider: SandboxProvider,
    pub mailer: Arc<RecordingMailer>,
    pub settings: Settings,
    pub state: AppState,
    pub worker: JoinHandle<()>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_mailer(RecordingMailer::default()).await
    }

    pub async fn with_mailer(mailer: RecordingMailer) -> Self {
        let mut settings = Settings::default();
        settings.payments.sandbox_secret = SANDBOX_SECRET.to_string();
        settings.payments.timeout_secs = 1;
        settings.auth.token_secret = TOKEN_SECRET.to_string();

        let courses = Arc::new(InMemoryCourseStore::new());
        let accounts = Arc::new(InMemoryAccountStore::new());
        let progress = Arc::new(InMemoryProgressStore::new());
        let stores = Stores {
            courses: courses.clone(),
            accounts: accounts.clone(),
            progress: progress.clone(),
        };
        let provider = SandboxProvider::new(SANDBOX_SECRET);
        let mailer = Arc::new(mailer);
        let (state, worker) = build_state(
            &settings,
            &stores,
            Arc::new(provider.clone()),
            mailer.clone(),
        );

        let harness = Self {
            courses,
            accounts,
            progress,
            provider,
            mailer,
            settings,
            state,
            worker,
        };
        harness.seed().await;
        harness
    }

    /// `c1` = 100, `c2` = 200, students `u1` and `u2`, instructor `i1`.
    async fn seed(&self) {
        for (id, name, price) in [("c1", "Rust 101", 100), ("c2", "Async Rust", 200)] {
            self.courses
                .put(Course::new(
                    id.into(),
                    name,
                    Price::new(Decimal::from(price)).unwrap(),
                ))
                .await
                .unwrap();
        }
        self.accounts
            .put(Account::new("u1".into(), "asha@example.com", Role::Student).with_name("Asha", "Rao"))
            .await
            .unwrap();
        self.accounts
            .put(Account::new("u2".into(), "ravi@example.com", Role::Student).with_name("Ravi", "K"))
            .await
            .unwrap();
        self.accounts
            .put(Account::new("i1".into(), "meera@example.com", Role::Instructor).with_name("Meera", "S"))
            .await
            .unwrap();
    }

    pub async fn course(&self, id: &str) -> Option<Course> {
        self.courses.get(&CourseId::from(id)).await.unwrap()
    }

    pub async fn account(&self, id: &str) -> Account {
        self.accounts.get(&AccountId::from(id)).await.unwrap().unwrap()
    }

    pub fn token(&self, account: &str) -> String {
        self.state.auth.issue(&AccountId::from(account))
    }

    /// Waits until the notification worker has attempted `count` sends.
    pub async fn wait_for_mail(&self, count: usize) {
        for _ in 0..200 {
            if self.mailer.attempts() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} mails, got {:?}",
            self.mailer.subjects()
        );
    }
}

pub fn ids(values: &[&str]) -> Vec<CourseId> {
    values.iter().copied().map(CourseId::from).collect()
}
