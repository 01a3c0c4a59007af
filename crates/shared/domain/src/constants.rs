//! Domain-level constants.
//!
//! These constants define paging defaults and validation requirements.

// =============================================================================
// Paging
// =============================================================================

/// Page size used when a request does not specify one
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Upper bound for a single page; larger requests are clamped
pub const MAX_PAGE_SIZE: u64 = 2000;

/// Number of rows returned by the `top3` finder
pub const TOP_MEMBERS_LIMIT: u64 = 3;

// =============================================================================
// Validation
// =============================================================================

/// Minimum username length requirement
pub const MIN_USERNAME_LENGTH: usize = 1;

/// Minimum team name length requirement
pub const MIN_TEAM_NAME_LENGTH: usize = 1;
