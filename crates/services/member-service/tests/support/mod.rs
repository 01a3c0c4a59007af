//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use domain::{Member, Team};
use member_service_lib::infra::Database;
use member_service_lib::repository::{CrudRepository, PersistenceContext};

/// Fresh in-memory database with the schema applied.
pub async fn setup() -> Database {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    Database::connect_in_memory()
        .await
        .expect("in-memory database should start")
}

/// Save a team in the given context
pub async fn save_team(ctx: &mut PersistenceContext, name: &str) -> Team {
    ctx.teams().save(Team::new(name)).await.unwrap()
}

/// Save a member, optionally in a team
pub async fn save_member(
    ctx: &mut PersistenceContext,
    username: &str,
    age: i32,
    team: Option<&Team>,
) -> Member {
    let member = match team {
        Some(team) => Member::with_team(username, age, team).unwrap(),
        None => Member::with_age(username, age),
    };
    ctx.members().save(member).await.unwrap()
}

/// teamA: member1 (10), member3 (30); teamB: member2 (20)
pub async fn save_two_teams(ctx: &mut PersistenceContext) -> (Team, Team) {
    let team_a = save_team(ctx, "teamA").await;
    let team_b = save_team(ctx, "teamB").await;
    save_member(ctx, "member1", 10, Some(&team_a)).await;
    save_member(ctx, "member2", 20, Some(&team_b)).await;
    save_member(ctx, "member3", 30, Some(&team_a)).await;
    (team_a, team_b)
}
