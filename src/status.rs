//! Desired output status as reported by a status source.

use crate::error::Result;
use log::error;
use std::fmt;

/// Integer status code read from the remote store.
///
/// Only an exact `1` means ON. Every other value, including codes outside
/// `{0, 1}`, drives the output low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i64);

impl Status {
    pub const OFF: Status = Status(0);
    pub const ON: Status = Status(1);

    pub fn is_on(self) -> bool {
        self.0 == 1
    }

    /// Collapse a fetch result into a status, logging the failure.
    ///
    /// Any error yields [`Status::OFF`] so an unreadable remote signal turns
    /// the output off instead of leaving it in its previous state.
    pub fn or_fail_safe(result: Result<Status>, source: &str) -> Status {
        match result {
            Ok(status) => status,
            Err(e) => {
                error!("Error fetching status from {}: {}", source, e);
                Status::OFF
            }
        }
    }
}

impl From<i64> for Status {
    fn from(value: i64) -> Self {
        Status(value)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    #[test]
    fn test_only_exact_one_is_on() {
        assert!(Status(1).is_on());
        assert!(!Status(0).is_on());
        assert!(!Status(2).is_on());
        assert!(!Status(-1).is_on());
    }

    #[test]
    fn test_fail_safe_maps_errors_to_off() {
        let status = Status::or_fail_safe(Err(SyncError::UnexpectedStatusCode(500)), "API");
        assert_eq!(status, Status::OFF);

        let status = Status::or_fail_safe(Ok(Status::ON), "API");
        assert_eq!(status, Status::ON);
    }
}
