//! Infrastructure wiring: which store backend serves this process.

use std::sync::Arc;

use anyhow::Context;

use ordermill_store::{MemoryStore, PostgresStore, Store};

/// Shared handles the route handlers pull out of request extensions.
///
/// Every request works against the same store handle; there is no other
/// shared mutable state.
pub struct AppServices {
    store: Arc<dyn Store>,
}

impl AppServices {
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Store {
        &*self.store
    }
}

/// Pick the store backend from the environment.
///
/// `DATABASE_URL` set → Postgres (schema bootstrapped on startup);
/// otherwise an in-memory store for dev.
pub async fn build_services() -> anyhow::Result<AppServices> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresStore::connect(&url)
                .await
                .context("failed to connect to postgres")?;
            store
                .migrate()
                .await
                .context("failed to run schema bootstrap")?;
            tracing::info!("using postgres store");
            Ok(AppServices::with_store(Arc::new(store)))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Ok(AppServices::with_store(Arc::new(MemoryStore::new())))
        }
    }
}
