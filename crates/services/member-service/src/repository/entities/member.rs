//! Member database entity for SeaORM.

use sea_orm::entity::prelude::*;
use sea_orm::{FromQueryResult, Set};

use domain::{Member, MemberDto, TeamRef};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "member")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub username: String,
    pub age: i32,
    /// Nullable foreign key to `team.id`, no cascade
    pub team_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id"
    )]
    Team,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity; the team stays an uninitialized
/// proxy.
impl From<Model> for Member {
    fn from(model: Model) -> Self {
        Member {
            id: Some(model.id),
            username: model.username,
            age: model.age,
            team: model.team_id.map(TeamRef::proxy),
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        }
    }
}

/// Insert model for a transient member; the id is generated by the database.
pub fn insert_model(member: &Member, now: DateTimeUtc) -> ActiveModel {
    ActiveModel {
        username: Set(member.username.clone()),
        age: Set(member.age),
        team_id: Set(member.team_id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

/// Row shape of the member/team name projection
#[derive(Debug, Clone, FromQueryResult)]
pub struct MemberDtoRow {
    pub id: i64,
    pub username: String,
    pub team_name: Option<String>,
}

impl From<MemberDtoRow> for MemberDto {
    fn from(row: MemberDtoRow) -> Self {
        MemberDto::new(row.id, row.username, row.team_name)
    }
}
