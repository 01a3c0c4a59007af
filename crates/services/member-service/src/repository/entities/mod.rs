//! SeaORM entities mapped to the `team` and `member` tables.

pub mod member;
pub mod team;
