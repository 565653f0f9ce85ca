//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::infra::{Cache, Database};
use crate::services::ServiceContainer;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// All application services
    pub services: Arc<dyn ServiceContainer>,
    /// Database connection, probed by the health check
    pub database: Option<Arc<Database>>,
    /// Redis connection; only present when locks are distributed
    pub cache: Option<Arc<Cache>>,
}

impl AppState {
    /// State with services only; health reports infrastructure as not configured.
    pub fn new(services: Arc<dyn ServiceContainer>) -> Self {
        Self {
            services,
            database: None,
            cache: None,
        }
    }

    /// State backed by live infrastructure.
    pub fn with_infrastructure(
        services: Arc<dyn ServiceContainer>,
        database: Arc<Database>,
        cache: Option<Arc<Cache>>,
    ) -> Self {
        Self {
            services,
            database: Some(database),
            cache,
        }
    }
}
