//! Member repository: CRUD plus derived, named, projection, bulk, fetch-join,
//! read-only and locking queries.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Value,
};

use common::{AppError, AppResult, OptionExt};
use domain::{
    Member, MemberDto, MemberId, MemberSearchCondition, Page, PageRequest, Slice, Sort,
    TOP_MEMBERS_LIMIT,
};

use super::base::CrudRepository;
use super::context::PersistenceContext;
use super::criteria::{apply_sort, Criterion, DerivedQuery};
use super::entities::{member, team};
use super::member_repository_custom::{MemberRepositoryCustom, MemberRepositoryImpl};
use super::query::named_query;

/// Member repository facade.
///
/// Custom query methods come from `MemberRepositoryCustom`, so callers see a
/// single interface.
#[async_trait]
pub trait MemberRepository:
    CrudRepository<Entity = Member, Id = MemberId> + MemberRepositoryCustom
{
    // -------------------------------------------------------------------------
    // Derived queries
    // -------------------------------------------------------------------------

    /// Exact username match and `age > bound`
    async fn find_by_username_and_age_greater_than(
        &mut self,
        username: &str,
        age: i32,
    ) -> AppResult<Vec<Member>>;

    /// First three members in id order
    async fn find_top3_by(&mut self) -> AppResult<Vec<Member>>;

    async fn find_list_by_username(&mut self, username: &str) -> AppResult<Vec<Member>>;

    /// Fails with `IncorrectResultSize` when more than one member matches
    async fn find_optional_by_username(&mut self, username: &str) -> AppResult<Option<Member>>;

    /// Username in the given list; an empty list matches nothing
    async fn find_by_names(&mut self, names: &[String]) -> AppResult<Vec<Member>>;

    /// Page of members with the given age, plus the total count
    async fn find_by_age(&mut self, age: i32, request: &PageRequest) -> AppResult<Page<Member>>;

    /// Slice of members with the given age; no count query
    async fn find_slice_by_age(&mut self, age: i32, request: &PageRequest)
        -> AppResult<Slice<Member>>;

    // -------------------------------------------------------------------------
    // Named and hand-written queries
    // -------------------------------------------------------------------------

    /// Runs the named query `Member.findByUsername`
    async fn find_by_username(&mut self, username: &str) -> AppResult<Vec<Member>>;

    /// Query with `:username` and `:age` parameters
    async fn find_user(&mut self, username: &str, age: i32) -> AppResult<Vec<Member>>;

    /// Query with `?1` and `?2` parameters
    async fn find_user_by_position(&mut self, username: &str, age: i32) -> AppResult<Vec<Member>>;

    async fn find_username_list(&mut self) -> AppResult<Vec<String>>;

    /// Members that have a team, projected with the team name
    async fn find_member_dto(&mut self) -> AppResult<Vec<MemberDto>>;

    // -------------------------------------------------------------------------
    // Bulk updates
    // -------------------------------------------------------------------------

    /// `age = age + 1` for every member with `age >= bound`.
    ///
    /// Runs directly against the database: managed members keep their old
    /// age until the context is cleared.
    async fn bulk_age_plus(&mut self, age: i32) -> AppResult<u64>;

    /// Flush, run `bulk_age_plus`, then clear the context
    async fn bulk_age_plus_clearing(&mut self, age: i32) -> AppResult<u64>;

    // -------------------------------------------------------------------------
    // Fetch strategies
    // -------------------------------------------------------------------------

    /// Members with a team, team loaded in the same statement
    async fn find_member_fetch_join(&mut self) -> AppResult<Vec<Member>>;

    /// All members with their team loaded, members without a team included
    async fn find_all_with_team(&mut self) -> AppResult<Vec<Member>>;

    async fn find_entity_graph_by_username(&mut self, username: &str) -> AppResult<Vec<Member>>;

    // -------------------------------------------------------------------------
    // Hints and locks
    // -------------------------------------------------------------------------

    /// Load a member as read-only; changes to it are never flushed
    async fn find_readonly_by_username(&mut self, username: &str) -> AppResult<Option<Member>>;

    /// `SELECT ... FOR UPDATE`; the lock is held until the context ends
    async fn find_lock_by_username(&mut self, username: &str) -> AppResult<Vec<Member>>;
}

/// Member repository bound to a persistence context
pub struct MemberStore<'a> {
    ctx: &'a mut PersistenceContext,
}

impl<'a> MemberStore<'a> {
    pub(crate) fn new(ctx: &'a mut PersistenceContext) -> Self {
        Self { ctx }
    }

    fn by_username(username: &str) -> DerivedQuery<member::Entity> {
        DerivedQuery::all().and(Criterion::equals(member::Column::Username, username))
    }

    /// Select by username with an exclusive row lock
    fn lock_by_username(username: &str) -> AppResult<Select<member::Entity>> {
        Ok(Self::by_username(username).select()?.lock_exclusive())
    }

    async fn count_where(&mut self, label: &str, condition: Condition) -> AppResult<u64> {
        self.ctx.record_statement(label);
        let total = member::Entity::find()
            .filter(condition)
            .count(self.ctx.connection())
            .await?;
        Ok(total)
    }

    /// Content query, then a count query unless the content settles the total
    async fn page(
        &mut self,
        label: &str,
        query: DerivedQuery<member::Entity>,
        request: &PageRequest,
    ) -> AppResult<Page<Member>> {
        let condition = query.condition();
        let select = query
            .order_by(request.sort.clone())
            .select()?
            .offset(request.offset())
            .limit(request.limit());
        let content = self.ctx.fetch_members(label, select, false).await?;

        let total = match request.known_total(content.len()) {
            Some(total) => total,
            None => {
                let count_label = format!("{label}.count");
                self.count_where(&count_label, condition).await?
            }
        };
        Ok(Page::new(content, request, total))
    }

    /// Single-result query; more than one row is an error
    async fn single(
        &mut self,
        label: &str,
        select: Select<member::Entity>,
        read_only: bool,
    ) -> AppResult<Option<Member>> {
        let mut rows = self.ctx.fetch_members(label, select, read_only).await?;
        if rows.len() > 1 {
            return Err(AppError::incorrect_result_size(rows.len()));
        }
        Ok(rows.pop())
    }

    fn backend(&self) -> sea_orm::DbBackend {
        self.ctx.connection().get_database_backend()
    }
}

#[async_trait]
impl<'a> CrudRepository for MemberStore<'a> {
    type Entity = Member;
    type Id = MemberId;

    async fn save(&mut self, member: Member) -> AppResult<Member> {
        member.validate()?;

        let Some(id) = member.id else {
            self.ctx.record_statement("Member.insert");
            let model = member::insert_model(&member, Utc::now())
                .insert(self.ctx.connection())
                .await?;
            tracing::debug!(member_id = model.id, "Member inserted");
            return Ok(self.ctx.register_member(Member::from(model)));
        };

        if let Some(merged) = self.ctx.merge_member(&member) {
            return Ok(merged);
        }

        // Detached: load the row, then copy the given state onto it
        self.ctx.record_statement("Member.merge");
        let model = member::Entity::find_by_id(id)
            .one(self.ctx.connection())
            .await?
            .ok_or_not_found()?;
        self.ctx.attach_member(model, false);
        self.ctx.merge_member(&member).ok_or_not_found()
    }

    async fn find_by_id(&mut self, id: MemberId) -> AppResult<Option<Member>> {
        if let Some(member) = self.ctx.managed_member(id) {
            return Ok(Some(member));
        }
        let mut rows = self
            .ctx
            .fetch_members("Member.findById", member::Entity::find_by_id(id), false)
            .await?;
        Ok(rows.pop())
    }

    async fn find_all(&mut self) -> AppResult<Vec<Member>> {
        let select = apply_sort(member::Entity::find(), &Sort::unsorted())?;
        self.ctx.fetch_members("Member.findAll", select, false).await
    }

    async fn find_all_by_id(&mut self, ids: &[MemberId]) -> AppResult<Vec<Member>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = DerivedQuery::<member::Entity>::all()
            .and(Criterion::is_in(member::Column::Id, ids.iter().copied()))
            .select()?;
        self.ctx.fetch_members("Member.findAllById", select, false).await
    }

    async fn find_all_sorted(&mut self, sort: &Sort) -> AppResult<Vec<Member>> {
        let select = apply_sort(member::Entity::find(), sort)?;
        self.ctx.fetch_members("Member.findAll", select, false).await
    }

    async fn find_all_paged(&mut self, request: &PageRequest) -> AppResult<Page<Member>> {
        self.page("Member.findAll", DerivedQuery::all(), request).await
    }

    async fn count(&mut self) -> AppResult<u64> {
        self.count_where("Member.count", Condition::all()).await
    }

    async fn delete(&mut self, member: &Member) -> AppResult<()> {
        let Some(id) = member.id else {
            return Ok(());
        };
        self.ctx.record_statement("Member.delete");
        member::Entity::delete_by_id(id)
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_member(id);
        Ok(())
    }

    async fn delete_by_id(&mut self, id: MemberId) -> AppResult<()> {
        self.ctx.record_statement("Member.delete");
        let result = member::Entity::delete_by_id(id)
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_member(id);
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn delete_all(&mut self) -> AppResult<u64> {
        self.ctx.record_statement("Member.deleteAll");
        let result = member::Entity::delete_many()
            .exec(self.ctx.connection())
            .await?;
        self.ctx.evict_all_members();
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl<'a> MemberRepositoryCustom for MemberStore<'a> {
    async fn find_member_custom(&mut self) -> AppResult<Vec<Member>> {
        MemberRepositoryImpl::new(&mut *self.ctx)
            .find_member_custom()
            .await
    }

    async fn search(&mut self, condition: &MemberSearchCondition) -> AppResult<Vec<Member>> {
        MemberRepositoryImpl::new(&mut *self.ctx)
            .search(condition)
            .await
    }
}

#[async_trait]
impl<'a> MemberRepository for MemberStore<'a> {
    async fn find_by_username_and_age_greater_than(
        &mut self,
        username: &str,
        age: i32,
    ) -> AppResult<Vec<Member>> {
        let select = Self::by_username(username)
            .and(Criterion::greater_than(member::Column::Age, age))
            .select()?;
        self.ctx
            .fetch_members("Member.findByUsernameAndAgeGreaterThan", select, false)
            .await
    }

    async fn find_top3_by(&mut self) -> AppResult<Vec<Member>> {
        let select = DerivedQuery::<member::Entity>::all()
            .first(TOP_MEMBERS_LIMIT)
            .select()?;
        self.ctx.fetch_members("Member.findTop3By", select, false).await
    }

    async fn find_list_by_username(&mut self, username: &str) -> AppResult<Vec<Member>> {
        let select = Self::by_username(username).select()?;
        self.ctx
            .fetch_members("Member.findListByUsername", select, false)
            .await
    }

    async fn find_optional_by_username(&mut self, username: &str) -> AppResult<Option<Member>> {
        let select = Self::by_username(username).select()?;
        self.single("Member.findOptionalByUsername", select, false)
            .await
    }

    async fn find_by_names(&mut self, names: &[String]) -> AppResult<Vec<Member>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let select = DerivedQuery::<member::Entity>::all()
            .and(Criterion::is_in(member::Column::Username, names.iter().cloned()))
            .select()?;
        self.ctx.fetch_members("Member.findByNames", select, false).await
    }

    async fn find_by_age(&mut self, age: i32, request: &PageRequest) -> AppResult<Page<Member>> {
        let query = DerivedQuery::all().and(Criterion::equals(member::Column::Age, age));
        self.page("Member.findByAge", query, request).await
    }

    async fn find_slice_by_age(
        &mut self,
        age: i32,
        request: &PageRequest,
    ) -> AppResult<Slice<Member>> {
        let select = DerivedQuery::<member::Entity>::all()
            .and(Criterion::equals(member::Column::Age, age))
            .order_by(request.sort.clone())
            .select()?
            .offset(request.offset())
            .limit(request.limit() + 1);
        let rows = self
            .ctx
            .fetch_members("Member.findSliceByAge", select, false)
            .await?;
        Ok(Slice::from_lookahead(rows, request))
    }

    async fn find_by_username(&mut self, username: &str) -> AppResult<Vec<Member>> {
        let statement = named_query("Member.findByUsername")?
            .bind_named(self.backend(), &[("username", Value::from(username))])?;
        self.ctx
            .fetch_members_raw("Member.findByUsername", statement)
            .await
    }

    async fn find_user(&mut self, username: &str, age: i32) -> AppResult<Vec<Member>> {
        let statement = named_query("Member.findUser")?.bind_named(
            self.backend(),
            &[("username", Value::from(username)), ("age", Value::from(age))],
        )?;
        self.ctx.fetch_members_raw("Member.findUser", statement).await
    }

    async fn find_user_by_position(&mut self, username: &str, age: i32) -> AppResult<Vec<Member>> {
        let statement = named_query("Member.findUserByPosition")?
            .bind_positional(self.backend(), vec![Value::from(username), Value::from(age)])?;
        self.ctx
            .fetch_members_raw("Member.findUserByPosition", statement)
            .await
    }

    async fn find_username_list(&mut self) -> AppResult<Vec<String>> {
        self.ctx.record_statement("Member.findUsernameList");
        let names = member::Entity::find()
            .select_only()
            .column(member::Column::Username)
            .order_by_asc(member::Column::Id)
            .into_tuple::<String>()
            .all(self.ctx.connection())
            .await?;
        Ok(names)
    }

    async fn find_member_dto(&mut self) -> AppResult<Vec<MemberDto>> {
        self.ctx.record_statement("Member.findMemberDto");
        let rows = member::Entity::find()
            .select_only()
            .column(member::Column::Id)
            .column(member::Column::Username)
            .column_as(team::Column::Name, "team_name")
            .join(JoinType::InnerJoin, member::Relation::Team.def())
            .order_by_asc(member::Column::Id)
            .into_model::<member::MemberDtoRow>()
            .all(self.ctx.connection())
            .await?;
        Ok(rows.into_iter().map(MemberDto::from).collect())
    }

    async fn bulk_age_plus(&mut self, age: i32) -> AppResult<u64> {
        self.ctx.record_statement("Member.bulkAgePlus");
        let result = member::Entity::update_many()
            .col_expr(member::Column::Age, Expr::col(member::Column::Age).add(1))
            .filter(member::Column::Age.gte(age))
            .exec(self.ctx.connection())
            .await?;
        tracing::info!(rows = result.rows_affected, bound = age, "Bulk age update");
        Ok(result.rows_affected)
    }

    async fn bulk_age_plus_clearing(&mut self, age: i32) -> AppResult<u64> {
        self.ctx.flush().await?;
        let rows = self.bulk_age_plus(age).await?;
        self.ctx.clear();
        Ok(rows)
    }

    async fn find_member_fetch_join(&mut self) -> AppResult<Vec<Member>> {
        let select = member::Entity::find()
            .filter(member::Column::TeamId.is_not_null())
            .order_by_asc(member::Column::Id);
        self.ctx
            .fetch_members_with_team("Member.findMemberFetchJoin", select)
            .await
    }

    async fn find_all_with_team(&mut self) -> AppResult<Vec<Member>> {
        let select = apply_sort(member::Entity::find(), &Sort::unsorted())?;
        self.ctx
            .fetch_members_with_team("Member.findAllWithTeam", select)
            .await
    }

    async fn find_entity_graph_by_username(&mut self, username: &str) -> AppResult<Vec<Member>> {
        let select = Self::by_username(username).select()?;
        self.ctx
            .fetch_members_with_team("Member.findEntityGraphByUsername", select)
            .await
    }

    async fn find_readonly_by_username(&mut self, username: &str) -> AppResult<Option<Member>> {
        let select = Self::by_username(username).select()?;
        self.single("Member.findReadOnlyByUsername", select, true)
            .await
    }

    async fn find_lock_by_username(&mut self, username: &str) -> AppResult<Vec<Member>> {
        let select = Self::lock_by_username(username)?;
        self.ctx
            .fetch_members("Member.findLockByUsername", select, false)
            .await
    }
}
