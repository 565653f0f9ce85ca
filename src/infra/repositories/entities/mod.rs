//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod attendance_record;
pub mod face_embedding;
pub mod user;

pub use attendance_record::{
    ActiveModel as AttendanceActiveModel, Entity as AttendanceEntity, Model as AttendanceModel,
};
pub use face_embedding::{
    ActiveModel as FaceEmbeddingActiveModel, Entity as FaceEmbeddingEntity,
};
pub use user::{ActiveModel as UserActiveModel, Entity as UserEntity};
