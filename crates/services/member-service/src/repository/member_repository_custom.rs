//! Hand-written member queries composed into `MemberRepository`.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};

use common::AppResult;
use domain::{Member, MemberSearchCondition};

use super::context::PersistenceContext;
use super::entities::{member, team};
use super::query::named_query;

/// Queries that are neither derived nor named
#[async_trait]
pub trait MemberRepositoryCustom: Send {
    /// All members through the hand-written `Member.findAllCustom` query
    async fn find_member_custom(&mut self) -> AppResult<Vec<Member>>;

    /// Members matching every set field of the condition
    async fn search(&mut self, condition: &MemberSearchCondition) -> AppResult<Vec<Member>>;
}

pub struct MemberRepositoryImpl<'a> {
    ctx: &'a mut PersistenceContext,
}

impl<'a> MemberRepositoryImpl<'a> {
    pub fn new(ctx: &'a mut PersistenceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<'a> MemberRepositoryCustom for MemberRepositoryImpl<'a> {
    async fn find_member_custom(&mut self) -> AppResult<Vec<Member>> {
        let backend = self.ctx.connection().get_database_backend();
        let statement = named_query("Member.findAllCustom")?.bind_positional(backend, Vec::new())?;
        self.ctx
            .fetch_members_raw("Member.findAllCustom", statement)
            .await
    }

    async fn search(&mut self, condition: &MemberSearchCondition) -> AppResult<Vec<Member>> {
        let select = member::Entity::find()
            .join(JoinType::LeftJoin, member::Relation::Team.def())
            .filter(search_condition(condition))
            .order_by_asc(member::Column::Id);
        self.ctx.fetch_members("Member.search", select, false).await
    }
}

/// Predicate over `member` left-joined with `team`.
///
/// Blank strings count as unset.
pub(crate) fn search_condition(condition: &MemberSearchCondition) -> Condition {
    Condition::all()
        .add_option(
            non_blank(&condition.username).map(|username| member::Column::Username.eq(username)),
        )
        .add_option(non_blank(&condition.team_name).map(|name| team::Column::Name.eq(name)))
        .add_option(condition.age_goe.map(|age| member::Column::Age.gte(age)))
        .add_option(condition.age_loe.map(|age| member::Column::Age.lte(age)))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}
