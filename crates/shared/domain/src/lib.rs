//! Domain layer - Core entities, projections and paging descriptors.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.
//! Persistence concerns (identity maps, SQL, transactions) live in the
//! member-service crate.

pub mod constants;
pub mod error;
pub mod member;
pub mod page;
pub mod team;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use member::{Member, MemberDto, MemberId, MemberSearchCondition};
pub use page::{Direction, Order, Page, PageRequest, Slice, Sort};
pub use team::{Team, TeamId, TeamRef};
