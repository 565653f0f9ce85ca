//! Directory view of a user, as seen by the attendance engine.
//!
//! The engine never writes these; they come from the user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::embedding::Embedding;
use crate::config::{ROLE_ADMIN, ROLE_EMPLOYEE};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Employee,
    Admin,
}

impl EmployeeRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, EmployeeRole::Admin)
    }
}

impl From<&str> for EmployeeRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => EmployeeRole::Admin,
            _ => EmployeeRole::Employee,
        }
    }
}

impl std::fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmployeeRole::Admin => write!(f, "{}", ROLE_ADMIN),
            EmployeeRole::Employee => write!(f, "{}", ROLE_EMPLOYEE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    /// Organisation-issued code, e.g. printed on a badge
    pub employee_id: String,
    pub name: String,
    pub role: EmployeeRole,
    /// Set once the person has left; departed users no longer check in.
    pub departed_at: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn has_departed(&self) -> bool {
        self.departed_at.is_some()
    }

    /// Only active non-admin users take part in check-in/check-out.
    pub fn can_record_attendance(&self) -> bool {
        !self.is_admin() && !self.has_departed()
    }
}

/// A face embedding enrolled for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrolledEmbedding {
    pub user_id: Uuid,
    pub embedding: Embedding,
}
