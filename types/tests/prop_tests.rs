use proptest::prelude::*;

use tally_types::{GroupId, GroupMembership, MeetingId, MeetingMemberId, Timestamp, UserId};

fn id_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,16}"
}

proptest! {
    /// Member ids parse back to the pair they were built from.
    #[test]
    fn member_id_display_parses_back(user in id_strategy(), meeting in id_strategy()) {
        let user_id = UserId::new(user).unwrap();
        let meeting_id = MeetingId::new(meeting).unwrap();
        let id = MeetingMemberId::new(&meeting_id, &user_id);
        let parsed = MeetingMemberId::parse(&id.to_string()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    /// Occurrence counting equals the number of pushes for that user.
    #[test]
    fn occurrences_match_pushes(picks in prop::collection::vec(0usize..4, 0..40)) {
        let users: Vec<UserId> = (0..4).map(|i| UserId::new(format!("u{i}")).unwrap()).collect();
        let mut group = GroupMembership::new(
            GroupId::new("g").unwrap(),
            MeetingId::new("m").unwrap(),
            Timestamp::EPOCH,
        );
        for &p in &picks {
            group.voter_ids.push(users[p].clone());
        }
        for (i, user) in users.iter().enumerate() {
            let expected = picks.iter().filter(|&&p| p == i).count();
            prop_assert_eq!(group.occurrences(user), expected);
        }
    }

    /// Records survive the binary encoding the LMDB backend uses.
    #[test]
    fn group_bincode_preserves_votes(picks in prop::collection::vec(0usize..3, 0..10)) {
        let mut group = GroupMembership::new(
            GroupId::new("g").unwrap(),
            MeetingId::new("m").unwrap(),
            Timestamp::from_millis(42),
        );
        group.voter_ids = picks.iter().map(|p| UserId::new(format!("u{p}")).unwrap()).collect();
        let encoded = bincode::serialize(&group).unwrap();
        let decoded: GroupMembership = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, group);
    }
}
