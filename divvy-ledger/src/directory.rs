//! Collaborator interfaces
//!
//! Identity resolution, group membership, and the clock are external
//! concerns consumed through these traits. The ledger never reaches
//! around them.

use crate::types::{GroupId, UserId};
use chrono::{DateTime, Utc};

/// Identity and membership resolution
pub trait Directory: Send + Sync {
    /// Whether the user is known to the system
    fn user_exists(&self, user: &UserId) -> bool;

    /// Whether the user is an active member of the group
    fn is_active_member(&self, group: &GroupId, user: &UserId) -> bool;
}

/// Monotonic wall-clock source for timestamps
pub trait Clock: Send + Sync {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Directory that accepts every user and membership.
///
/// Useful for tests and single-tenant deployments where identity is
/// enforced upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenDirectory;

impl Directory for OpenDirectory {
    fn user_exists(&self, _user: &UserId) -> bool {
        true
    }

    fn is_active_member(&self, _group: &GroupId, _user: &UserId) -> bool {
        true
    }
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
