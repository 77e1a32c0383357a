//! The two records the vote-casting subsystem mutates.

use serde::{Deserialize, Serialize};

use crate::{GroupId, MeetingId, MeetingMemberId, Timestamp, UserId};

/// Remaining votes of one user in one meeting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterBudget {
    pub meeting_id: MeetingId,
    pub user_id: UserId,
    /// Votes the user may still cast. Never negative by construction.
    pub votes_remaining: u32,
    pub updated_at: Timestamp,
}

impl VoterBudget {
    pub fn new(
        meeting_id: MeetingId,
        user_id: UserId,
        votes_remaining: u32,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            meeting_id,
            user_id,
            votes_remaining,
            updated_at,
        }
    }

    /// Key of this record in every budget store.
    pub fn key(&self) -> MeetingMemberId {
        MeetingMemberId::new(&self.meeting_id, &self.user_id)
    }
}

/// Votes placed on one reflection group.
///
/// `voter_ids` holds one entry per vote, so a user appears as many times as
/// they have voted for the group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: GroupId,
    pub meeting_id: MeetingId,
    pub voter_ids: Vec<UserId>,
    pub updated_at: Timestamp,
}

impl GroupMembership {
    pub fn new(id: GroupId, meeting_id: MeetingId, updated_at: Timestamp) -> Self {
        Self {
            id,
            meeting_id,
            voter_ids: Vec::new(),
            updated_at,
        }
    }

    /// Number of votes `user_id` holds on this group, counted with multiplicity.
    pub fn occurrences(&self, user_id: &UserId) -> usize {
        self.voter_ids.iter().filter(|v| *v == user_id).count()
    }

    /// Votes as a sorted multiset, for order-insensitive comparison across stores.
    pub fn sorted_votes(&self) -> Vec<&UserId> {
        let mut votes: Vec<&UserId> = self.voter_ids.iter().collect();
        votes.sort();
        votes
    }
}
