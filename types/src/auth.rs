//! Caller credential passed through to the authorization capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{MeetingId, UserId};

/// Decoded caller credential.
///
/// Verification of the token itself happens upstream; this crate only reads
/// the claims.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    /// The viewer the token was issued to.
    pub sub: UserId,
    /// Meetings the viewer is a member of.
    #[serde(default)]
    pub meetings: BTreeSet<MeetingId>,
}

impl AuthToken {
    pub fn new(sub: UserId) -> Self {
        Self {
            sub,
            meetings: BTreeSet::new(),
        }
    }

    pub fn with_meeting(mut self, meeting_id: MeetingId) -> Self {
        self.meetings.insert(meeting_id);
        self
    }

    pub fn viewer_id(&self) -> &UserId {
        &self.sub
    }

    pub fn is_member_of(&self, meeting_id: &MeetingId) -> bool {
        self.meetings.contains(meeting_id)
    }
}

/// Decides whether a caller may act inside a meeting.
pub trait AuthCapability: Send + Sync {
    fn is_meeting_member(&self, token: &AuthToken, meeting_id: &MeetingId) -> bool;
}

/// Grants access when the token carries a claim for the meeting.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeetingClaimsAuth;

impl AuthCapability for MeetingClaimsAuth {
    fn is_meeting_member(&self, token: &AuthToken, meeting_id: &MeetingId) -> bool {
        token.is_member_of(meeting_id)
    }
}
