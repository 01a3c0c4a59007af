//! Repository layer over SeaORM.
//!
//! Every repository borrows a `PersistenceContext`; see `context` for the
//! unit-of-work rules they share.

mod base;
mod context;
mod criteria;
pub mod entities;
mod member_query_repository;
mod member_repository;
mod member_repository_custom;
mod query;
mod team_repository;

pub use base::CrudRepository;
pub use context::PersistenceContext;
pub use criteria::{apply_sort, Criterion, DerivedQuery, PropertyColumns};
pub use member_query_repository::MemberQueryRepository;
pub use member_repository::{MemberRepository, MemberStore};
pub use member_repository_custom::{MemberRepositoryCustom, MemberRepositoryImpl};
pub use query::{named_query, QueryTemplate};
pub use team_repository::{TeamRepository, TeamStore};
