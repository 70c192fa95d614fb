//! Test-data seeding, run once the schema is in place.

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clients::error::ClientError;
use crate::clients::generator;
use crate::clients::store::ClientStore;
use crate::config::SeedConfig;
use crate::db::{Availability, AvailabilityListener};

const BATCH_SIZE: u64 = 20;

pub struct ClientSeeder {
    store: Arc<dyn ClientStore>,
    availability: Arc<Availability>,
    config: SeedConfig,
    done: AtomicBool,
    /// Set when a run stored some clients and then failed.
    partial: AtomicBool,
}

impl ClientSeeder {
    pub fn new(store: Arc<dyn ClientStore>, availability: Arc<Availability>, config: SeedConfig) -> Self {
        Self {
            store,
            availability,
            config,
            done: AtomicBool::new(false),
            partial: AtomicBool::new(false),
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Insert `client_count` generated clients. Returns how many were stored.
    ///
    /// After a failed run that stored some clients, the next run resumes:
    /// clients whose seed account number already exists are skipped.
    pub async fn seed(&self) -> Result<u64, ClientError> {
        let resuming = self.partial.load(Ordering::Acquire);
        let existing = self.store.count().await?;
        if existing > 0 && resuming {
            tracing::info!(existing, "Resuming interrupted seed");
        } else if existing > 0 {
            if !self.config.clean_before {
                tracing::info!(existing, "Clients already present, skipping seed");
                return Ok(0);
            }
            let removed = self.store.delete_all().await?;
            tracing::info!(removed, "Removed existing clients before seeding");
        }

        let today = Utc::now().date_naive();
        let clients: Vec<_> = {
            let mut rng = StdRng::from_entropy();
            (1..=u64::from(self.config.client_count))
                .map(|i| generator::client(&mut rng, generator::seed_account_number(i), today))
                .collect()
        };

        let mut inserted = 0;
        for (i, client) in clients.into_iter().enumerate() {
            match self.store.insert(client).await {
                Ok(_) => inserted += 1,
                Err(ClientError::AlreadyExists(msg)) => {
                    tracing::debug!(reason = %msg, "Skipping duplicate generated client");
                }
                Err(e) => {
                    if inserted > 0 {
                        self.partial.store(true, Ordering::Release);
                    }
                    return Err(e);
                }
            }
            if (i as u64 + 1) % BATCH_SIZE == 0 {
                tracing::debug!(inserted, "Seed progress");
            }
        }

        self.partial.store(false, Ordering::Release);
        tracing::info!(inserted, requested = self.config.client_count, "Seeded clients");
        Ok(inserted)
    }
}

#[async_trait]
impl AvailabilityListener for ClientSeeder {
    async fn on_available(&self) {
        if !self.config.enabled || !self.availability.is_schema_initialized() {
            return;
        }
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.seed().await {
            tracing::warn!(error = %e, "Seeding failed, will retry on next connection");
            self.done.store(false, Ordering::Release);
        }
    }
}
