use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub access_key: String,

    /// Weak reference to `users.id`; no foreign key, no cascade.
    pub owner_id: Option<i32>,

    pub operator_name: String,

    pub character_name: String,

    pub series_source: String,

    /// JSON array of tags
    pub sourcing_vibe: String,

    pub contact_method: String,

    pub contact_handle: String,

    pub notes: Option<String>,

    pub status: String,

    pub rejection_reason: Option<String>,

    /// Incremented on every status write.
    pub version: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::request_status_events::Entity")]
    StatusEvents,
}

impl Related<super::request_status_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
