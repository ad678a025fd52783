use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Guestbook entry. Replies reference their parent entry; admin replies have
/// no password (`password_hash` is null) and are flagged `is_admin_reply`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "guestbook")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub parent_id: Option<i32>,
    pub author_name: String,
    pub author_email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_private: bool,
    pub is_admin_reply: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
