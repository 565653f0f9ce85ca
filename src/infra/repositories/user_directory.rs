//! Read-only access to the user directory.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QuerySelect,
    RelationTrait,
};
use uuid::Uuid;

use super::entities::face_embedding::{self, Entity as FaceEmbeddingEntity};
use super::entities::user::{self, Entity as UserEntity};
use crate::config::ROLE_ADMIN;
use crate::domain::{Employee, EnrolledEmbedding};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Directory lookups the attendance engine depends on.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by ID, departed or not
    async fn find_user(&self, id: Uuid) -> AppResult<Option<Employee>>;

    /// Find a user by organisation-issued employee code
    async fn find_by_employee_id(&self, employee_id: &str) -> AppResult<Option<Employee>>;

    /// Enrolled embeddings of users who are neither admins nor departed
    async fn find_eligible_embeddings(&self) -> AppResult<Vec<EnrolledEmbedding>>;
}

/// Concrete implementation of UserDirectory
pub struct DirectoryStore {
    db: DatabaseConnection,
}

impl DirectoryStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DirectoryStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<Employee>> {
        let result = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Employee::from))
    }

    async fn find_by_employee_id(&self, employee_id: &str) -> AppResult<Option<Employee>> {
        let result = UserEntity::find()
            .filter(user::Column::EmployeeId.eq(employee_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Employee::from))
    }

    async fn find_eligible_embeddings(&self) -> AppResult<Vec<EnrolledEmbedding>> {
        let models = FaceEmbeddingEntity::find()
            .join(JoinType::InnerJoin, face_embedding::Relation::User.def())
            .filter(user::Column::Role.ne(ROLE_ADMIN))
            .filter(user::Column::DepartedAt.is_null())
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut enrolled = Vec::with_capacity(models.len());
        for model in models {
            match model.to_enrolled() {
                Ok(embedding) => enrolled.push(embedding),
                Err(e) => {
                    tracing::warn!(
                        embedding_id = %model.id,
                        error = %e,
                        "Skipping unreadable embedding"
                    )
                }
            }
        }
        Ok(enrolled)
    }
}
