//! Standalone member queries, used directly rather than through
//! `MemberRepository`.

use sea_orm::{EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait};

use common::AppResult;
use domain::{Member, MemberDto, MemberSearchCondition};

use super::context::PersistenceContext;
use super::entities::{member, team};
use super::member_repository_custom::search_condition;

pub struct MemberQueryRepository<'a> {
    ctx: &'a mut PersistenceContext,
}

impl<'a> MemberQueryRepository<'a> {
    pub(crate) fn new(ctx: &'a mut PersistenceContext) -> Self {
        Self { ctx }
    }

    pub async fn find_all_members(&mut self) -> AppResult<Vec<Member>> {
        let select = member::Entity::find().order_by_asc(member::Column::Id);
        self.ctx
            .fetch_members("MemberQuery.findAllMembers", select, false)
            .await
    }

    /// Projection with the team name; members without a team are included
    /// unless the condition filters on the team name.
    pub async fn find_member_dtos(
        &mut self,
        condition: &MemberSearchCondition,
    ) -> AppResult<Vec<MemberDto>> {
        self.ctx.record_statement("MemberQuery.findMemberDtos");
        let rows = member::Entity::find()
            .select_only()
            .column(member::Column::Id)
            .column(member::Column::Username)
            .column_as(team::Column::Name, "team_name")
            .join(JoinType::LeftJoin, member::Relation::Team.def())
            .filter(search_condition(condition))
            .order_by_asc(member::Column::Id)
            .into_model::<member::MemberDtoRow>()
            .all(self.ctx.connection())
            .await?;
        Ok(rows.into_iter().map(MemberDto::from).collect())
    }
}
