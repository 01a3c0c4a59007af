//! Member Service Library
//!
//! Repositories for members and teams over SeaORM, bound to a transactional
//! persistence context. The binary only exposes migration and seeding
//! commands.

pub mod config;
pub mod infra;
pub mod repository;

use tracing::info;

use domain::Member;

use crate::config::MemberServiceConfig;
use crate::infra::Database;
use crate::repository::CrudRepository;

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = MemberServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Insert `count` members named `user{i}` aged `i` in one committed
/// transaction. Returns the number of members inserted.
pub async fn seed_members(count: u32) -> Result<u32, Box<dyn std::error::Error>> {
    let config = MemberServiceConfig::from_env();
    let db = Database::connect(&config.database).await?;
    seed(&db, count).await?;
    info!(count, "Seeded members");
    Ok(count)
}

/// Seed into an already connected database
pub async fn seed(db: &Database, count: u32) -> common::AppResult<()> {
    let mut ctx = db.begin().await?;
    {
        let mut members = ctx.members();
        for i in 1..=count {
            let age = i32::try_from(i).map_err(|_| common::AppError::validation("count too large"))?;
            members.save(Member::with_age(format!("user{i}"), age)).await?;
        }
    }
    ctx.commit().await
}
