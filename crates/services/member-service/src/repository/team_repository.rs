//! Team repository.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use common::{AppError, AppResult, OptionExt};
use domain::{DomainError, Member, Page, PageRequest, Sort, Team, TeamId};

use super::base::CrudRepository;
use super::context::PersistenceContext;
use super::criteria::{apply_sort, Criterion, DerivedQuery};
use super::entities::{member, team};

#[async_trait]
pub trait TeamRepository: CrudRepository<Entity = Team, Id = TeamId> {
    async fn find_by_name(&mut self, name: &str) -> AppResult<Vec<Team>>;

    /// Members of a persisted team, in id order
    async fn find_members_of(&mut self, team: &Team) -> AppResult<Vec<Member>>;
}

/// Team repository bound to a persistence context
pub struct TeamStore<'a> {
    ctx: &'a mut PersistenceContext,
}

impl<'a> TeamStore<'a> {
    pub(crate) fn new(ctx: &'a mut PersistenceContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl<'a> CrudRepository for TeamStore<'a> {
    type Entity = Team;
    type Id = TeamId;

    async fn save(&mut self, entity: Team) -> AppResult<Team> {
        entity.validate()?;

        let Some(id) = entity.id else {
            self.ctx.record_statement("Team.insert");
            let model = team::insert_model(&entity, Utc::now())
                .insert(self.ctx.connection())
                .await?;
            tracing::debug!(team_id = model.id, "Team inserted");
            return Ok(self.ctx.register_team(Team::from(model)));
        };

        if let Some(merged) = self.ctx.merge_team(&entity) {
            return Ok(merged);
        }

        self.ctx.record_statement("Team.merge");
        let model = team::Entity::find_by_id(id)
            .one(self.ctx.connection())
            .await?
            .ok_or_not_found()?;
        self.ctx.attach_team(model, false);
        self.ctx.merge_team(&entity).ok_or_not_found()
    }

    async fn find_by_id(&mut self, id: TeamId) -> AppResult<Option<Team>> {
        if let Some(found) = self.ctx.managed_team(id) {
            return Ok(Some(found));
        }
        let mut rows = self
            .ctx
            .fetch_teams("Team.findById", team::Entity::find_by_id(id))
            .await?;
        Ok(rows.pop())
    }

    async fn find_all(&mut self) -> AppResult<Vec<Team>> {
        let select = apply_sort(team::Entity::find(), &Sort::unsorted())?;
        self.ctx.fetch_teams("Team.findAll", select).await
    }

    async fn find_all_by_id(&mut self, ids: &[TeamId]) -> AppResult<Vec<Team>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = DerivedQuery::<team::Entity>::all()
            .and(Criterion::is_in(team::Column::Id, ids.iter().copied()))
            .select()?;
        self.ctx.fetch_teams("Team.findAllById", select).await
    }

    async fn find_all_sorted(&mut self, sort: &Sort) -> AppResult<Vec<Team>> {
        let select = apply_sort(team::Entity::find(), sort)?;
        self.ctx.fetch_teams("Team.findAll", select).await
    }

    async fn find_all_paged(&mut self, request: &PageRequest) -> AppResult<Page<Team>> {
        let select = apply_sort(team::Entity::find(), &request.sort)?
            .offset(request.offset())
            .limit(request.limit());
        let content = self.ctx.fetch_teams("Team.findAll", select).await?;

        let total = match request.known_total(content.len()) {
            Some(total) => total,
            None => self.count().await?,
        };
        Ok(Page::new(content, request, total))
    }

    async fn count(&mut self) -> AppResult<u64> {
        self.ctx.record_statement("Team.count");
        Ok(team::Entity::find().count(self.ctx.connection()).await?)
    }

    /// Fails with a database error while members still reference the team
    async fn delete(&mut self, entity: &Team) -> AppResult<()> {
        let Some(id) = entity.id else {
            return Ok(());
        };
        self.ctx.record_statement("Team.delete");
        team::Entity::delete_by_id(id)
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_team(id);
        Ok(())
    }

    async fn delete_by_id(&mut self, id: TeamId) -> AppResult<()> {
        self.ctx.record_statement("Team.delete");
        let result = team::Entity::delete_by_id(id)
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_team(id);
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn delete_all(&mut self) -> AppResult<u64> {
        self.ctx.record_statement("Team.deleteAll");
        let result = team::Entity::delete_many()
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_all_teams();
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl<'a> TeamRepository for TeamStore<'a> {
    async fn find_by_name(&mut self, name: &str) -> AppResult<Vec<Team>> {
        let select = DerivedQuery::<team::Entity>::all()
            .and(Criterion::equals(team::Column::Name, name))
            .select()?;
        self.ctx.fetch_teams("Team.findByName", select).await
    }

    async fn find_members_of(&mut self, team: &Team) -> AppResult<Vec<Member>> {
        let id = team
            .id
            .ok_or_else(|| DomainError::transient_reference("Team"))?;
        let select = member::Entity::find()
            .filter(member::Column::TeamId.eq(id))
            .order_by_asc(member::Column::Id);
        self.ctx.fetch_members("Team.members", select, false).await
    }
}
