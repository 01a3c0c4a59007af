//! Member domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_USERNAME_LENGTH;
use crate::error::{DomainError, DomainResult};
use crate::team::{Team, TeamId, TeamRef};

/// Surrogate key of a member
pub type MemberId = i64;

/// Member domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// `None` until the member has been saved
    pub id: Option<MemberId>,
    pub username: String,
    pub age: i32,
    pub team: Option<TeamRef>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    /// Create a transient member with age 0 and no team
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            age: 0,
            team: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Create a transient member with an age
    pub fn with_age(username: impl Into<String>, age: i32) -> Self {
        Self {
            age,
            ..Self::new(username)
        }
    }

    /// Create a transient member belonging to a persisted team
    pub fn with_team(username: impl Into<String>, age: i32, team: &Team) -> DomainResult<Self> {
        let mut member = Self::with_age(username, age);
        member.change_team(team)?;
        Ok(member)
    }

    /// Check if the member has been assigned an identity
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = age;
    }

    /// Move the member to another team. The team must already be persisted.
    pub fn change_team(&mut self, team: &Team) -> DomainResult<()> {
        self.team = Some(TeamRef::to(team)?);
        Ok(())
    }

    /// Drop the team association
    pub fn leave_team(&mut self) {
        self.team = None;
    }

    /// Id of the associated team, loaded or not
    pub fn team_id(&self) -> Option<TeamId> {
        self.team.as_ref().map(TeamRef::id)
    }

    /// Validate invariants before persisting
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.chars().count() < MIN_USERNAME_LENGTH {
            return Err(DomainError::validation("username must not be empty"));
        }
        Ok(())
    }
}

/// Field equality without the audit timestamps.
impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.username == other.username
            && self.age == other.age
            && self.team == other.team
    }
}

impl Eq for Member {}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            Some(id) => write!(f, "Member(id={}, username={}, age={})", id, self.username, self.age),
            None => write!(f, "Member(transient, username={}, age={})", self.username, self.age),
        }
    }
}

/// Member projection joined with its team name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberDto {
    pub fn new(id: MemberId, username: impl Into<String>, team_name: Option<String>) -> Self {
        Self {
            id,
            username: username.into(),
            team_name,
        }
    }

    /// Projection of a persisted member without touching its team
    pub fn from_member(member: &Member) -> Option<Self> {
        member.id.map(|id| Self::new(id, member.username.clone(), None))
    }
}

/// Optional filters for dynamic member searches.
///
/// Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemberSearchCondition {
    pub username: Option<String>,
    pub team_name: Option<String>,
    /// Inclusive lower age bound
    pub age_goe: Option<i32>,
    /// Inclusive upper age bound
    pub age_loe: Option<i32>,
}

impl MemberSearchCondition {
    /// Check if no filter is set
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.team_name.is_none()
            && self.age_goe.is_none()
            && self.age_loe.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_member_is_transient_with_zero_age() {
        let member = Member::new("memberA");
        assert!(!member.is_persisted());
        assert_eq!(member.age, 0);
        assert!(member.team.is_none());
    }

    #[test]
    fn with_team_requires_persisted_team() {
        let err = Member::with_team("member1", 10, &Team::new("teamA")).unwrap_err();
        assert!(matches!(err, DomainError::TransientReference(_)));

        let team = Team {
            id: Some(3),
            ..Team::new("teamA")
        };
        let member = Member::with_team("member1", 10, &team).unwrap();
        assert_eq!(member.team_id(), Some(3));
    }

    #[test]
    fn equality_ignores_timestamps_and_team_loading_state() {
        let mut a = Member::with_age("AAA", 10);
        a.id = Some(1);
        a.team = Some(TeamRef::proxy(2));
        let mut b = a.clone();
        b.created_at = Some(Utc::now());
        b.team = Some(TeamRef::Loaded(Team {
            id: Some(2),
            ..Team::new("teamA")
        }));
        assert_eq!(a, b);

        b.set_age(11);
        assert_ne!(a, b);
    }

    #[test]
    fn dto_from_transient_member_is_none() {
        assert!(MemberDto::from_member(&Member::new("x")).is_none());
    }

    #[test]
    fn empty_username_fails_validation() {
        assert!(Member::new("").validate().is_err());
    }

    #[test]
    fn default_search_condition_is_empty() {
        assert!(MemberSearchCondition::default().is_empty());
        let cond = MemberSearchCondition {
            age_goe: Some(10),
            ..Default::default()
        };
        assert!(!cond.is_empty());
    }
}
