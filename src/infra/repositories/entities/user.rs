//! User directory entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Employee, EmployeeRole};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub employee_id: String,
    pub name: String,
    pub role: String,
    /// NULL = still employed
    pub departed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::face_embedding::Entity")]
    FaceEmbeddings,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
}

impl Related<super::face_embedding::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FaceEmbeddings.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for Employee {
    fn from(model: Model) -> Self {
        Employee {
            id: model.id,
            employee_id: model.employee_id,
            name: model.name,
            role: EmployeeRole::from(model.role.as_str()),
            departed_at: model.departed_at,
        }
    }
}
