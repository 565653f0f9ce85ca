//! Service Container - Centralized service access.
//!
//! Handlers reach every use case through `ServiceContainer`, so tests can
//! swap the whole service layer for mocks.

use std::sync::Arc;

use super::{
    AuthService, IdentityResolver, IdentityService, LedgerManager, LedgerService, ReportManager,
    ReportService, SessionManager, SessionService, TokenVerifier,
};
use crate::config::Config;
use crate::infra::{EmbeddingExtractor, UnitOfWork, UserLocks};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    /// Get token verification service
    fn auth(&self) -> Arc<dyn AuthService>;

    /// Get check-in/check-out service
    fn sessions(&self) -> Arc<dyn SessionService>;

    /// Get admin ledger service
    fn ledger(&self) -> Arc<dyn LedgerService>;

    /// Get reporting service
    fn reports(&self) -> Arc<dyn ReportService>;
}

/// Concrete implementation of ServiceContainer
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    session_service: Arc<dyn SessionService>,
    ledger_service: Arc<dyn LedgerService>,
    report_service: Arc<dyn ReportService>,
}

impl Services {
    /// Wire every service over one unit of work
    pub fn build<U: UnitOfWork + 'static>(
        uow: Arc<U>,
        extractor: Arc<dyn EmbeddingExtractor>,
        locks: Arc<dyn UserLocks>,
        config: &Config,
    ) -> Self {
        let auth_service = Arc::new(TokenVerifier::from_config(config));
        // Face resolution is only reachable through check events
        let identity: Arc<dyn IdentityService> = Arc::new(IdentityResolver::new(
            uow.directory(),
            extractor,
            config.matching.clone(),
        ));
        let session_service = Arc::new(SessionManager::new(
            uow.clone(),
            identity,
            locks.clone(),
            config.policy.clone(),
        ));
        let ledger_service = Arc::new(LedgerManager::new(
            uow.clone(),
            locks,
            config.policy.clone(),
        ));
        let report_service = Arc::new(ReportManager::new(uow, config.policy.clone()));

        Self {
            auth_service,
            session_service,
            ledger_service,
            report_service,
        }
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn sessions(&self) -> Arc<dyn SessionService> {
        self.session_service.clone()
    }

    fn ledger(&self) -> Arc<dyn LedgerService> {
        self.ledger_service.clone()
    }

    fn reports(&self) -> Arc<dyn ReportService> {
        self.report_service.clone()
    }
}
