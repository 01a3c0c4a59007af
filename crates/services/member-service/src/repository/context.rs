//! Persistence context: a unit of work bound to one database transaction.
//!
//! # Responsibility
//! - Keep an identity map of managed members and teams, with the state they
//!   had when they were loaded (the snapshot).
//! - Defer updates of managed entities until `flush` (write-behind).
//! - Hand out repositories that share the same transaction and identity map.
//!
//! # Invariants
//! - An id maps to at most one managed instance per context. Queries that hit
//!   an already managed row return the managed state, not the row.
//! - Read-only entities are never written by `flush`.
//! - Queries do not flush implicitly; flush before raw reads that must observe
//!   pending changes.
//! - Dropping the context without `commit` rolls the transaction back.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, EntityTrait, Select, Set, Statement, Unchanged,
};

use common::{AppResult, OptionExt};
use domain::{Member, MemberId, Team, TeamId, TeamRef};

use super::entities::{member, team};
use super::member_query_repository::MemberQueryRepository;
use super::member_repository::MemberStore;
use super::team_repository::TeamStore;

/// Managed entity with its load-time snapshot
#[derive(Debug)]
struct Managed<T> {
    entity: T,
    snapshot: T,
    read_only: bool,
}

impl<T: Clone + PartialEq> Managed<T> {
    fn new(entity: T, read_only: bool) -> Self {
        Self {
            snapshot: entity.clone(),
            entity,
            read_only,
        }
    }

    fn is_dirty(&self) -> bool {
        !self.read_only && self.entity != self.snapshot
    }
}

/// Unit of work over a single transaction.
pub struct PersistenceContext {
    txn: DatabaseTransaction,
    members: HashMap<MemberId, Managed<Member>>,
    teams: HashMap<TeamId, Managed<Team>>,
    statements: u64,
}

impl PersistenceContext {
    pub(crate) fn new(txn: DatabaseTransaction) -> Self {
        Self {
            txn,
            members: HashMap::new(),
            teams: HashMap::new(),
            statements: 0,
        }
    }

    /// Member repository bound to this context
    pub fn members(&mut self) -> MemberStore<'_> {
        MemberStore::new(self)
    }

    /// Team repository bound to this context
    pub fn teams(&mut self) -> TeamStore<'_> {
        TeamStore::new(self)
    }

    /// Standalone member query component bound to this context
    pub fn member_queries(&mut self) -> MemberQueryRepository<'_> {
        MemberQueryRepository::new(self)
    }

    /// Transaction used by every statement of this context
    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    // =========================================================================
    // Statement accounting
    // =========================================================================

    /// Number of SQL statements issued since creation or the last reset
    pub fn statement_count(&self) -> u64 {
        self.statements
    }

    pub fn reset_statement_count(&mut self) {
        self.statements = 0;
    }

    pub(crate) fn record_statement(&mut self, query: &str) {
        self.statements += 1;
        tracing::debug!(query, statement = self.statements, "Executing statement");
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Check if the member is managed by this context
    pub fn contains_member(&self, member: &Member) -> bool {
        member.id.is_some_and(|id| self.members.contains_key(&id))
    }

    /// Check if the team is managed by this context
    pub fn contains_team(&self, team: &Team) -> bool {
        team.id.is_some_and(|id| self.teams.contains_key(&id))
    }

    /// Check if the member is managed as read-only
    pub fn is_read_only(&self, member: &Member) -> bool {
        member
            .id
            .and_then(|id| self.members.get(&id))
            .is_some_and(|managed| managed.read_only)
    }

    /// Check if any managed entity has unflushed changes
    pub fn is_dirty(&self) -> bool {
        self.members.values().any(Managed::is_dirty) || self.teams.values().any(Managed::is_dirty)
    }

    /// Stop managing a member; pending changes to it are discarded
    pub fn detach_member(&mut self, member: &Member) {
        if let Some(id) = member.id {
            self.members.remove(&id);
        }
    }

    /// Stop managing a team; pending changes to it are discarded
    pub fn detach_team(&mut self, team: &Team) {
        if let Some(id) = team.id {
            self.teams.remove(&id);
        }
    }

    /// Detach every managed entity without flushing
    pub fn clear(&mut self) {
        tracing::debug!(
            members = self.members.len(),
            teams = self.teams.len(),
            "Clearing persistence context"
        );
        self.members.clear();
        self.teams.clear();
    }

    /// Write pending changes of managed, non read-only entities.
    ///
    /// Returns the number of UPDATE statements issued.
    pub async fn flush(&mut self) -> AppResult<u64> {
        let mut written = 0;

        let dirty_teams: Vec<TeamId> = dirty_ids(&self.teams);
        for id in dirty_teams {
            let Some(managed) = self.teams.get(&id) else {
                continue;
            };
            let now = Utc::now();
            let active = team::ActiveModel {
                id: Unchanged(id),
                name: Set(managed.entity.name.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            self.record_statement("Team.update");
            active.update(&self.txn).await?;

            if let Some(managed) = self.teams.get_mut(&id) {
                managed.entity.updated_at = Some(now);
                managed.snapshot = managed.entity.clone();
            }
            written += 1;
        }

        let dirty_members: Vec<MemberId> = dirty_ids(&self.members);
        for id in dirty_members {
            let Some(managed) = self.members.get(&id) else {
                continue;
            };
            let now = Utc::now();
            let active = member::ActiveModel {
                id: Unchanged(id),
                username: Set(managed.entity.username.clone()),
                age: Set(managed.entity.age),
                team_id: Set(managed.entity.team_id()),
                updated_at: Set(now),
                ..Default::default()
            };
            self.record_statement("Member.update");
            active.update(&self.txn).await?;

            if let Some(managed) = self.members.get_mut(&id) {
                managed.entity.updated_at = Some(now);
                managed.snapshot = managed.entity.clone();
            }
            written += 1;
        }

        if written > 0 {
            tracing::info!(updated = written, "Flushed persistence context");
        }
        Ok(written)
    }

    /// Flush pending changes and commit the transaction
    pub async fn commit(mut self) -> AppResult<()> {
        self.flush().await?;
        let PersistenceContext { txn, .. } = self;
        txn.commit().await?;
        tracing::info!("Transaction committed");
        Ok(())
    }

    /// Discard pending changes and roll the transaction back
    pub async fn rollback(self) -> AppResult<()> {
        let PersistenceContext { txn, .. } = self;
        txn.rollback().await?;
        tracing::info!("Transaction rolled back");
        Ok(())
    }

    /// Initialize the member's team reference.
    ///
    /// A loaded reference or a team already managed by this context costs no
    /// statement; an uninitialized proxy issues one SELECT.
    pub async fn resolve_team(&mut self, member: &mut Member) -> AppResult<Option<Team>> {
        let Some(team_ref) = member.team.as_ref() else {
            return Ok(None);
        };
        if let Some(team) = team_ref.get() {
            return Ok(Some(team.clone()));
        }

        let id = team_ref.id();
        let team = match self.managed_team(id) {
            Some(team) => team,
            None => {
                self.record_statement("Team.findById");
                let model = team::Entity::find_by_id(id)
                    .one(&self.txn)
                    .await?
                    .ok_or_not_found()?;
                self.attach_team(model, false)
            }
        };

        member.team = Some(TeamRef::Loaded(team.clone()));
        Ok(Some(team))
    }

    // =========================================================================
    // Identity map (crate internal)
    // =========================================================================

    pub(crate) fn managed_member(&self, id: MemberId) -> Option<Member> {
        self.members.get(&id).map(|m| self.member_view(&m.entity))
    }

    pub(crate) fn managed_team(&self, id: TeamId) -> Option<Team> {
        self.teams.get(&id).map(|t| t.entity.clone())
    }

    /// Register a freshly inserted member
    pub(crate) fn register_member(&mut self, member: Member) -> Member {
        let member = normalized(member);
        let view = self.member_view(&member);
        if let Some(id) = member.id {
            self.members.insert(id, Managed::new(member, false));
        }
        view
    }

    /// Register a freshly inserted team
    pub(crate) fn register_team(&mut self, team: Team) -> Team {
        if let Some(id) = team.id {
            self.teams.insert(id, Managed::new(team.clone(), false));
        }
        team
    }

    /// Attach a loaded row; an already managed instance wins over the row
    pub(crate) fn attach_member(&mut self, model: member::Model, read_only: bool) -> Member {
        let id = model.id;
        let managed = self
            .members
            .entry(id)
            .or_insert_with(|| Managed::new(Member::from(model), read_only));
        let entity = managed.entity.clone();
        self.member_view(&entity)
    }

    pub(crate) fn attach_team(&mut self, model: team::Model, read_only: bool) -> Team {
        let id = model.id;
        self.teams
            .entry(id)
            .or_insert_with(|| Managed::new(Team::from(model), read_only))
            .entity
            .clone()
    }

    /// Copy the given state onto the managed member, if any
    pub(crate) fn merge_member(&mut self, member: &Member) -> Option<Member> {
        let id = member.id?;
        let managed = self.members.get_mut(&id)?;
        managed.entity.username = member.username.clone();
        managed.entity.age = member.age;
        managed.entity.team = member.team_id().map(TeamRef::proxy);
        let entity = managed.entity.clone();
        Some(self.member_view(&entity))
    }

    /// Copy the given state onto the managed team, if any
    pub(crate) fn merge_team(&mut self, team: &Team) -> Option<Team> {
        let id = team.id?;
        let managed = self.teams.get_mut(&id)?;
        managed.entity.name = team.name.clone();
        Some(managed.entity.clone())
    }

    pub(crate) fn evict_member(&mut self, id: MemberId) {
        self.members.remove(&id);
    }

    pub(crate) fn evict_team(&mut self, id: TeamId) {
        self.teams.remove(&id);
    }

    pub(crate) fn evict_all_members(&mut self) {
        self.members.clear();
    }

    pub(crate) fn evict_all_teams(&mut self) {
        self.teams.clear();
    }

    // =========================================================================
    // Fetch helpers shared by the repositories
    // =========================================================================

    /// Run a member query and attach the rows
    pub(crate) async fn fetch_members(
        &mut self,
        label: &str,
        select: Select<member::Entity>,
        read_only: bool,
    ) -> AppResult<Vec<Member>> {
        self.record_statement(label);
        let models = select.all(&self.txn).await?;
        Ok(models
            .into_iter()
            .map(|model| self.attach_member(model, read_only))
            .collect())
    }

    /// Run a member query joined with its team and attach both sides
    pub(crate) async fn fetch_members_with_team(
        &mut self,
        label: &str,
        select: Select<member::Entity>,
    ) -> AppResult<Vec<Member>> {
        self.record_statement(label);
        let rows = select.find_also_related(team::Entity).all(&self.txn).await?;
        Ok(rows
            .into_iter()
            .map(|(member_model, team_model)| {
                if let Some(team_model) = team_model {
                    self.attach_team(team_model, false);
                }
                self.attach_member(member_model, false)
            })
            .collect())
    }

    /// Run a hand-written member query and attach the rows
    pub(crate) async fn fetch_members_raw(
        &mut self,
        label: &str,
        statement: Statement,
    ) -> AppResult<Vec<Member>> {
        self.record_statement(label);
        let models = member::Entity::find()
            .from_raw_sql(statement)
            .all(&self.txn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| self.attach_member(model, false))
            .collect())
    }

    /// Run a team query and attach the rows
    pub(crate) async fn fetch_teams(
        &mut self,
        label: &str,
        select: Select<team::Entity>,
    ) -> AppResult<Vec<Team>> {
        self.record_statement(label);
        let models = select.all(&self.txn).await?;
        Ok(models
            .into_iter()
            .map(|model| self.attach_team(model, false))
            .collect())
    }

    /// Managed state as handed to callers: the team is shown loaded when this
    /// context already manages it.
    fn member_view(&self, member: &Member) -> Member {
        let mut view = member.clone();
        if let Some(TeamRef::Proxy { id }) = view.team {
            if let Some(team) = self.teams.get(&id) {
                view.team = Some(TeamRef::Loaded(team.entity.clone()));
            }
        }
        view
    }
}

impl std::fmt::Debug for PersistenceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceContext")
            .field("members", &self.members.len())
            .field("teams", &self.teams.len())
            .field("statements", &self.statements)
            .finish()
    }
}

/// Managed members keep their team as a bare id
fn normalized(mut member: Member) -> Member {
    member.team = member.team_id().map(TeamRef::proxy);
    member
}

fn dirty_ids<K: Copy + Ord, T: Clone + PartialEq>(map: &HashMap<K, Managed<T>>) -> Vec<K> {
    let mut ids: Vec<K> = map
        .iter()
        .filter(|(_, managed)| managed.is_dirty())
        .map(|(id, _)| *id)
        .collect();
    ids.sort();
    ids
}
