//! Team repository, custom member queries and service entry points.

mod support;

use common::AppError;
use domain::{MemberDto, MemberSearchCondition, Team};
use member_service_lib::repository::{
    CrudRepository, MemberRepository, MemberRepositoryCustom, MemberRepositoryImpl, TeamRepository,
};
use sea_orm::{ConnectionTrait, DbBackend};

use support::{save_member, save_team, save_two_teams, setup};

#[tokio::test]
async fn test_team_crud() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();

    let team_a = save_team(&mut ctx, "teamA").await;
    save_team(&mut ctx, "teamB").await;

    let mut teams = ctx.teams();
    assert_eq!(teams.count().await.unwrap(), 2);
    assert_eq!(teams.find_by_name("teamA").await.unwrap(), vec![team_a.clone()]);
    assert!(teams.find_by_name("teamC").await.unwrap().is_empty());

    teams.delete(&team_a).await.unwrap();
    assert_eq!(teams.count().await.unwrap(), 1);
    assert!(matches!(teams.delete_by_id(999).await, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_team_rename_is_flushed() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();

    let mut team = save_team(&mut ctx, "teamA").await;
    team.rename("teamZ");
    ctx.teams().save(team.clone()).await.unwrap();
    assert_eq!(ctx.flush().await.unwrap(), 1);

    ctx.clear();
    let found = ctx.teams().find_by_id(team.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(found.name, "teamZ");
}

#[tokio::test]
async fn test_blank_team_name_is_rejected() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();

    let result = ctx.teams().save(Team::new("   ")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_merge_of_unknown_team_fails() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();

    let mut ghost = Team::new("ghost");
    ghost.id = Some(999);
    let result = ctx.teams().save(ghost).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_find_members_of_team() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    let (team_a, team_b) = save_two_teams(&mut ctx).await;

    let members = ctx.teams().find_members_of(&team_a).await.unwrap();
    let names: Vec<&str> = members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["member1", "member3"]);
    assert_eq!(ctx.teams().find_members_of(&team_b).await.unwrap().len(), 1);

    let transient = ctx.teams().find_members_of(&Team::new("teamC")).await;
    assert!(matches!(transient, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_deleting_referenced_team_fails() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    let (team_a, _) = save_two_teams(&mut ctx).await;

    let result = ctx.teams().delete(&team_a).await;
    assert!(matches!(result, Err(AppError::Database(_))));
}

#[tokio::test]
async fn test_find_member_custom() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_member(&mut ctx, "AAA", 10, None).await;
    save_member(&mut ctx, "BBB", 20, None).await;

    let through_facade = ctx.members().find_member_custom().await.unwrap();
    let direct = MemberRepositoryImpl::new(&mut ctx)
        .find_member_custom()
        .await
        .unwrap();

    assert_eq!(through_facade.len(), 2);
    assert_eq!(through_facade, direct);
}

#[tokio::test]
async fn test_search() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_two_teams(&mut ctx).await;
    save_member(&mut ctx, "loner", 40, None).await;

    let mut members = ctx.members();
    let everyone = members.search(&MemberSearchCondition::default()).await.unwrap();
    assert_eq!(everyone.len(), 4);

    let condition = MemberSearchCondition {
        team_name: Some("teamA".into()),
        age_goe: Some(20),
        ..Default::default()
    };
    let found = members.search(&condition).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "member3");

    let condition = MemberSearchCondition {
        age_goe: Some(15),
        age_loe: Some(35),
        ..Default::default()
    };
    let names: Vec<String> = members
        .search(&condition)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.username)
        .collect();
    assert_eq!(names, vec!["member2", "member3"]);
}

#[tokio::test]
async fn test_member_query_repository() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_two_teams(&mut ctx).await;
    let loner = save_member(&mut ctx, "loner", 40, None).await;

    let mut queries = ctx.member_queries();
    assert_eq!(queries.find_all_members().await.unwrap().len(), 4);

    let dtos = queries
        .find_member_dtos(&MemberSearchCondition::default())
        .await
        .unwrap();
    assert_eq!(dtos.len(), 4);
    assert_eq!(dtos[3], MemberDto::new(loner.id.unwrap(), "loner", None));
    assert_eq!(dtos[0].team_name.as_deref(), Some("teamA"));

    let team_b = MemberSearchCondition {
        team_name: Some("teamB".into()),
        ..Default::default()
    };
    let dtos = queries.find_member_dtos(&team_b).await.unwrap();
    assert_eq!(dtos.len(), 1);
    assert_eq!(dtos[0].username, "member2");
}

#[tokio::test]
async fn test_seed_commits_members() {
    let db = setup().await;
    member_service_lib::seed(&db, 5).await.unwrap();

    let mut ctx = db.begin().await.unwrap();
    assert_eq!(ctx.members().count().await.unwrap(), 5);
    let user3 = ctx.members().find_list_by_username("user3").await.unwrap();
    assert_eq!(user3[0].age, 3);
}

#[tokio::test]
async fn test_migration_status_and_ping() {
    let db = setup().await;
    db.ping().await.unwrap();
    assert_eq!(db.connection().get_database_backend(), DbBackend::Sqlite);

    let status = db.migration_status().await.unwrap();
    assert_eq!(status.len(), 2);
    assert!(status.iter().all(|(_, applied)| *applied));
}
