//! Enrolled face embedding entity for SeaORM.
//!
//! Vectors are stored as JSON text so the same schema works on every backend.

use sea_orm::entity::prelude::*;

use crate::domain::{Embedding, EnrolledEmbedding};
use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "face_embeddings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub vector: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_enrolled(&self) -> AppResult<EnrolledEmbedding> {
        let values: Vec<f32> = serde_json::from_str(&self.vector).map_err(|e| {
            AppError::internal(format!("Corrupt embedding {}: {}", self.id, e))
        })?;
        Ok(EnrolledEmbedding {
            user_id: self.user_id,
            embedding: Embedding::new(values)?,
        })
    }
}

pub fn encode_vector(embedding: &Embedding) -> AppResult<String> {
    serde_json::to_string(embedding)
        .map_err(|e| AppError::internal(format!("Embedding serialization error: {}", e)))
}
