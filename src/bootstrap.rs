//! Process wiring shared by the binary and the integration tests.

use crate::application::checkout::OrderInitiation;
use crate::application::notification::Notifier;
use crate::application::settlement::EnrollmentSettlement;
use crate::application::verification::PaymentVerification;
use crate::config::{LOG_ENV_VAR, Settings};
use crate::domain::ports::{
    AccountStoreRef, CourseStoreRef, MailSenderRef, PaymentProviderRef, ProgressStoreRef,
};
use crate::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryCourseStore, InMemoryProgressStore,
};
use crate::interfaces::http::AppState;
use crate::interfaces::http::auth::TokenAuthenticator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialise tracing with the `COURSEPAY_LOG` filter, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// The three storage ports, backed by one adapter.
#[derive(Clone)]
pub struct Stores {
    pub courses: CourseStoreRef,
    pub accounts: AccountStoreRef,
    pub progress: ProgressStoreRef,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            courses: Arc::new(InMemoryCourseStore::new()),
            accounts: Arc::new(InMemoryAccountStore::new()),
            progress: Arc::new(InMemoryProgressStore::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let store = crate::infrastructure::rocksdb::RocksDBStore::open(path)?;
        Ok(Self {
            courses: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            progress: Arc::new(store),
        })
    }
}

/// Builds the application services and starts the notification worker.
///
/// Must be called inside a tokio runtime.
pub fn build_state(
    settings: &Settings,
    stores: &Stores,
    provider: PaymentProviderRef,
    mailer: MailSenderRef,
) -> (AppState, JoinHandle<()>) {
    let (notifier, worker) = Notifier::spawn(settings.mail.queue_capacity, mailer);

    let settlement = Arc::new(EnrollmentSettlement::new(
        stores.courses.clone(),
        stores.accounts.clone(),
        stores.progress.clone(),
        notifier.clone(),
    ));
    let checkout = OrderInitiation::new(
        stores.courses.clone(),
        stores.accounts.clone(),
        provider.clone(),
        settings.payments.currency.clone(),
    );
    let verification = PaymentVerification::new(
        provider,
        settlement,
        stores.accounts.clone(),
        notifier,
        settings.payments.timeout(),
    );

    let state = AppState {
        checkout: Arc::new(checkout),
        verification: Arc::new(verification),
        auth: Arc::new(TokenAuthenticator::new(settings.auth.token_secret.clone())),
    };
    (state, worker)
}
