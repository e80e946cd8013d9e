#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nomad_acme_store::models::{
    Account, CertificateBundle, Domain, KeyType, Registration, RegistrationBody,
};
use nomad_acme_store::placement::PlacementContext;
use nomad_acme_store::variables::{
    MemoryVariables, Variable, VariableItems, VariablesApi, VariablesError,
};

pub const TOKEN: &str = "659c8d84-1b2d-73ee-f6bb-6b2421055a61";

/// Placement of a Nomad task `job1/group1/task1` with a token and secrets dir.
pub fn nomad_task() -> PlacementContext {
    PlacementContext::task("job1", "group1", "task1")
        .with_token(TOKEN)
        .with_secrets_dir("/some/path")
}

pub fn account(email: &str) -> Account {
    Account::new(email, vec![1, 2, 3, 4, 5], KeyType::new("FAKE")).with_registration(
        Registration {
            body: RegistrationBody {
                status: "valid".to_string(),
                contact: vec![email.to_string()],
                terms_of_service_agreed: true,
                ..Default::default()
            },
            uri: "https://example.com/dir".to_string(),
        },
    )
}

pub fn cert(main: &str) -> CertificateBundle {
    CertificateBundle::new(
        Domain::new(main).with_sans(["one", "two"]),
        vec![9, 8, 7, 6, 5],
        vec![5, 6, 7, 8, 9],
        "default",
    )
}

/// Wraps [`MemoryVariables`], delaying each call and recording the highest
/// number of calls in flight at once.
pub struct SlowVariables {
    inner: MemoryVariables,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowVariables {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryVariables::new(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryVariables {
        &self.inner
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl VariablesApi for SlowVariables {
    async fn create(&self, variable: &Variable) -> Result<(), VariablesError> {
        self.enter().await;
        let result = self.inner.create(variable).await;
        self.leave();
        result
    }

    async fn get_variable_items(&self, path: &str) -> Result<VariableItems, VariablesError> {
        self.enter().await;
        let result = self.inner.get_variable_items(path).await;
        self.leave();
        result
    }
}
