//! Team domain entity and the member-side association reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MIN_TEAM_NAME_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Surrogate key of a team
pub type TeamId = i64;

/// Team domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// `None` until the team has been saved
    pub id: Option<TeamId>,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Team {
    /// Create a transient team
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Check if the team has been assigned an identity
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Rename the team
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Validate invariants before persisting
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().chars().count() < MIN_TEAM_NAME_LENGTH {
            return Err(DomainError::validation("team name must not be blank"));
        }
        Ok(())
    }
}

/// Identity equality; timestamps are bookkeeping.
impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl Eq for Team {}

/// Member-side reference to a team.
///
/// A `Proxy` is an uninitialized lazy reference that only knows the id. It can
/// be resolved through a live persistence context; once the context is gone it
/// stays a bare id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TeamRef {
    Proxy { id: TeamId },
    Loaded(Team),
}

impl TeamRef {
    /// Build a reference to a persisted team
    pub fn to(team: &Team) -> DomainResult<Self> {
        match team.id {
            Some(_) => Ok(TeamRef::Loaded(team.clone())),
            None => Err(DomainError::transient_reference("Team")),
        }
    }

    /// Build an uninitialized reference
    pub fn proxy(id: TeamId) -> Self {
        TeamRef::Proxy { id }
    }

    /// Id of the referenced team
    pub fn id(&self) -> TeamId {
        match self {
            TeamRef::Proxy { id } => *id,
            // Loaded refs are only built from persisted teams
            TeamRef::Loaded(team) => team.id.unwrap_or_default(),
        }
    }

    /// Whether the team state is available without a query
    pub fn is_loaded(&self) -> bool {
        matches!(self, TeamRef::Loaded(_))
    }

    /// The loaded team, if initialized
    pub fn get(&self) -> Option<&Team> {
        match self {
            TeamRef::Loaded(team) => Some(team),
            TeamRef::Proxy { .. } => None,
        }
    }
}

/// Two references are equal when they point at the same team.
impl PartialEq for TeamRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for TeamRef {}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(id: TeamId, name: &str) -> Team {
        Team {
            id: Some(id),
            ..Team::new(name)
        }
    }

    #[test]
    fn reference_to_transient_team_is_rejected() {
        let err = TeamRef::to(&Team::new("teamA")).unwrap_err();
        assert!(matches!(err, DomainError::TransientReference(_)));
    }

    #[test]
    fn proxy_equals_loaded_reference_with_same_id() {
        let loaded = TeamRef::to(&persisted(7, "teamA")).unwrap();
        assert_eq!(loaded, TeamRef::proxy(7));
        assert_ne!(loaded, TeamRef::proxy(8));
        assert!(loaded.is_loaded());
        assert!(TeamRef::proxy(7).get().is_none());
    }

    #[test]
    fn blank_team_name_fails_validation() {
        assert!(Team::new("  ").validate().is_err());
        assert!(Team::new("teamA").validate().is_ok());
    }
}
