//! Nullable authorization: a fixed answer for every check.

use tally_types::{AuthCapability, AuthToken, MeetingId};

pub struct NullAuth {
    allow: bool,
}

impl NullAuth {
    pub fn allow_all() -> Self {
        Self { allow: true }
    }

    pub fn deny_all() -> Self {
        Self { allow: false }
    }
}

impl AuthCapability for NullAuth {
    fn is_meeting_member(&self, _token: &AuthToken, _meeting_id: &MeetingId) -> bool {
        self.allow
    }
}
