//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! Ledger writes go through the Unit of Work for transaction management.

mod auth_service;
pub mod container;
mod identity_service;
mod ledger_service;
mod report_service;
mod session_service;

// Service Container
pub use container::{ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Claims, TokenVerifier};
pub use identity_service::{IdentityResolver, IdentityService};
pub use ledger_service::{LedgerManager, LedgerService, ManualRecord};
pub use report_service::{ReportManager, ReportService, SummaryQuery, Window};
pub use session_service::{
    AttendanceEvent, EventOutcome, EventSubject, SessionManager, SessionService,
};

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
#[cfg(any(test, feature = "test-utils"))]
pub use identity_service::MockIdentityService;
#[cfg(any(test, feature = "test-utils"))]
pub use ledger_service::MockLedgerService;
#[cfg(any(test, feature = "test-utils"))]
pub use report_service::MockReportService;
#[cfg(any(test, feature = "test-utils"))]
pub use session_service::MockSessionService;
