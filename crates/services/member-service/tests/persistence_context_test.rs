//! Persistence context, fetch strategy and transaction tests.

mod support;

use common::AppError;
use domain::{Member, TeamRef};
use member_service_lib::repository::{CrudRepository, MemberRepository};

use support::{save_member, save_team, save_two_teams, setup};

#[tokio::test]
async fn test_find_member_lazy() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_two_teams(&mut ctx).await;
    ctx.flush().await.unwrap();
    ctx.clear();

    ctx.reset_statement_count();
    let mut members = ctx.members().find_all().await.unwrap();
    assert_eq!(ctx.statement_count(), 1);
    assert!(members
        .iter()
        .all(|m| matches!(m.team, Some(TeamRef::Proxy { .. }))));

    // One query per distinct team: teamA, teamB, then teamA is managed
    let mut names = Vec::new();
    for member in &mut members {
        let team = ctx.resolve_team(member).await.unwrap().unwrap();
        names.push(team.name);
        assert!(member.team.as_ref().is_some_and(TeamRef::is_loaded));
    }
    assert_eq!(names, vec!["teamA", "teamB", "teamA"]);
    assert_eq!(ctx.statement_count(), 3);
}

#[tokio::test]
async fn test_find_member_fetch_join() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_two_teams(&mut ctx).await;
    save_member(&mut ctx, "loner", 40, None).await;
    ctx.clear();

    ctx.reset_statement_count();
    let mut members = ctx.members().find_member_fetch_join().await.unwrap();
    assert_eq!(members.len(), 3);
    assert!(members
        .iter()
        .all(|m| m.team.as_ref().is_some_and(TeamRef::is_loaded)));

    for member in &mut members {
        ctx.resolve_team(member).await.unwrap();
    }
    assert_eq!(ctx.statement_count(), 1);
}

#[tokio::test]
async fn test_entity_graph() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    save_two_teams(&mut ctx).await;
    save_member(&mut ctx, "loner", 40, None).await;
    ctx.clear();

    ctx.reset_statement_count();
    let all = ctx.members().find_all_with_team().await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(ctx.statement_count(), 1);
    assert_eq!(all[3].team, None);
    assert!(all[..3]
        .iter()
        .all(|m| m.team.as_ref().is_some_and(TeamRef::is_loaded)));

    let member1 = ctx
        .members()
        .find_entity_graph_by_username("member1")
        .await
        .unwrap();
    assert_eq!(member1.len(), 1);
    let team = member1[0].team.as_ref().and_then(TeamRef::get).unwrap();
    assert_eq!(team.name, "teamA");
}

#[tokio::test]
async fn test_detached_team_stays_a_proxy() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    let team = save_team(&mut ctx, "teamA").await;
    save_member(&mut ctx, "member1", 10, Some(&team)).await;
    ctx.detach_team(&team);

    // Team no longer managed: the member comes back with a proxy
    let members = ctx.members().find_list_by_username("member1").await.unwrap();
    assert!(matches!(members[0].team, Some(TeamRef::Proxy { .. })));
    assert!(!ctx.contains_team(&team));
}

#[tokio::test]
async fn test_committed_data_is_visible_to_new_context() {
    let db = setup().await;

    let mut ctx = db.begin().await.unwrap();
    let saved = save_member(&mut ctx, "member1", 10, None).await;
    ctx.commit().await.unwrap();

    let mut ctx = db.begin().await.unwrap();
    let found = ctx.members().find_by_id(saved.id.unwrap()).await.unwrap();
    assert_eq!(found, Some(saved));
}

#[tokio::test]
async fn test_uncommitted_data_is_rolled_back() {
    let db = setup().await;

    let mut ctx = db.begin().await.unwrap();
    save_member(&mut ctx, "member1", 10, None).await;
    ctx.rollback().await.unwrap();

    {
        let mut dropped = db.begin().await.unwrap();
        save_member(&mut dropped, "member2", 20, None).await;
    }

    let mut ctx = db.begin().await.unwrap();
    assert_eq!(ctx.members().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_commit_flushes_pending_changes() {
    let db = setup().await;

    let mut ctx = db.begin().await.unwrap();
    let mut member = save_member(&mut ctx, "member1", 10, None).await;
    member.set_age(11);
    ctx.members().save(member).await.unwrap();
    ctx.commit().await.unwrap();

    let mut ctx = db.begin().await.unwrap();
    let found = ctx.members().find_list_by_username("member1").await.unwrap();
    assert_eq!(found[0].age, 11);
}

#[tokio::test]
async fn test_merge_detached_member() {
    let db = setup().await;

    let mut ctx = db.begin().await.unwrap();
    let saved = save_member(&mut ctx, "member1", 10, None).await;
    ctx.commit().await.unwrap();

    let mut ctx = db.begin().await.unwrap();
    let mut detached = saved.clone();
    detached.set_username("renamed");
    let merged = ctx.members().save(detached).await.unwrap();
    assert_eq!(merged.username, "renamed");
    assert!(ctx.contains_member(&merged));
    ctx.commit().await.unwrap();

    let mut ctx = db.begin().await.unwrap();
    let found = ctx.members().find_by_id(saved.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(found.username, "renamed");
}

#[tokio::test]
async fn test_merge_of_unknown_id_fails() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();

    let mut ghost = Member::with_age("ghost", 1);
    ghost.id = Some(999);
    let result = ctx.members().save(ghost).await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_detach_discards_pending_changes() {
    let db = setup().await;
    let mut ctx = db.begin().await.unwrap();
    let mut member = save_member(&mut ctx, "member1", 10, None).await;

    member.set_age(99);
    ctx.members().save(member.clone()).await.unwrap();
    ctx.detach_member(&member);
    assert!(!ctx.contains_member(&member));
    assert_eq!(ctx.flush().await.unwrap(), 0);

    let found = ctx.members().find_list_by_username("member1").await.unwrap();
    assert_eq!(found[0].age, 10);
}
