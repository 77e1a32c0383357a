//! String identifiers for meetings, users, reflection groups, and meeting members.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Separator between the user and meeting halves of a [`MeetingMemberId`].
pub const MEMBER_ID_SEPARATOR: &str = "::";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier, rejecting empty strings and the member-id separator.
            pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
                let s = raw.into();
                if s.is_empty() {
                    return Err(TypesError::EmptyId);
                }
                if s.contains(MEMBER_ID_SEPARATOR) {
                    return Err(TypesError::ReservedSeparator(s));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypesError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a retrospective meeting.
    MeetingId
);

string_id!(
    /// Identifier of a participant.
    UserId
);

string_id!(
    /// Identifier of a reflection group (the vote target).
    GroupId
);

/// Key of a voter budget record: one per (meeting, user) pair.
///
/// Rendered as `{user_id}::{meeting_id}`, matching the team-member id format
/// used by the rest of the application.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeetingMemberId {
    meeting_id: MeetingId,
    user_id: UserId,
}

impl MeetingMemberId {
    pub fn new(meeting_id: &MeetingId, user_id: &UserId) -> Self {
        Self {
            meeting_id: meeting_id.clone(),
            user_id: user_id.clone(),
        }
    }

    /// Parse the `{user_id}::{meeting_id}` form.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        let (user, meeting) = s
            .split_once(MEMBER_ID_SEPARATOR)
            .ok_or_else(|| TypesError::MalformedMemberId(s.to_string()))?;
        let user_id = UserId::new(user).map_err(|_| TypesError::MalformedMemberId(s.to_string()))?;
        let meeting_id =
            MeetingId::new(meeting).map_err(|_| TypesError::MalformedMemberId(s.to_string()))?;
        Ok(Self {
            meeting_id,
            user_id,
        })
    }

    pub fn meeting_id(&self) -> &MeetingId {
        &self.meeting_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl fmt::Display for MeetingMemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.user_id, MEMBER_ID_SEPARATOR, self.meeting_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_renders_user_first() {
        let meeting = MeetingId::new("meet1").unwrap();
        let user = UserId::new("user9").unwrap();
        let id = MeetingMemberId::new(&meeting, &user);
        assert_eq!(id.to_string(), "user9::meet1");
    }

    #[test]
    fn member_id_parse_matches_display() {
        let id = MeetingMemberId::parse("user9::meet1").unwrap();
        assert_eq!(id.user_id().as_str(), "user9");
        assert_eq!(id.meeting_id().as_str(), "meet1");
    }

    #[test]
    fn member_id_parse_rejects_missing_separator() {
        assert!(matches!(
            MeetingMemberId::parse("user9meet1"),
            Err(TypesError::MalformedMemberId(_))
        ));
    }

    #[test]
    fn ids_reject_empty_and_separator() {
        assert_eq!(UserId::new(""), Err(TypesError::EmptyId));
        assert!(matches!(
            GroupId::new("a::b"),
            Err(TypesError::ReservedSeparator(_))
        ));
    }
}
