//! Team database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use domain::Team;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "team")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::member::Entity")]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl From<Model> for Team {
    fn from(model: Model) -> Self {
        Team {
            id: Some(model.id),
            name: model.name,
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        }
    }
}

/// Insert model for a transient team; the id is generated by the database.
pub fn insert_model(team: &Team, now: DateTimeUtc) -> ActiveModel {
    ActiveModel {
        name: Set(team.name.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}
