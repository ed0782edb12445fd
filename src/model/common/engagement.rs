//! Announcement engagement: vote toggling, read marks and tally projection.
//!
//! Everything here is pure and works on in-memory maps. Persistence lives in
//! the announcement endpoints, which store one row per vote and per read mark
//! and rebuild these maps from the rows.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Option label -> number of users currently selecting it.
pub type Tallies = BTreeMap<String, u64>;

/// User (email) -> the single option they currently select.
pub type VoterMap = BTreeMap<String, String>;

/// User (email) -> whether they have seen the announcement.
pub type ReadMap = BTreeMap<String, bool>;

/// Options given to announcements created without any.
pub const DEFAULT_OPTIONS: [&str; 2] = ["agree", "oppose"];

/// The effect of a user clicking an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// No previous vote; the option is now selected.
    Cast { option: String },
    /// The previous selection is replaced by another option.
    Switch { from: String, to: String },
    /// The user clicked their current option again, withdrawing their vote.
    Withdraw { option: String },
}

impl Toggle {
    /// Classify a click on `requested` given the user's `current` selection.
    pub fn decide(current: Option<&str>, requested: &str) -> Self {
        match current {
            None => Self::Cast {
                option: requested.to_string(),
            },
            Some(current) if current == requested => Self::Withdraw {
                option: requested.to_string(),
            },
            Some(current) => Self::Switch {
                from: current.to_string(),
                to: requested.to_string(),
            },
        }
    }

    /// The user's selection once this toggle is applied.
    pub fn selection(&self) -> Option<&str> {
        match self {
            Self::Cast { option } | Self::Switch { to: option, .. } => Some(option),
            Self::Withdraw { .. } => None,
        }
    }
}

/// Apply a click by `user` on `option` to the tallies and voter map.
///
/// Any previous selection loses one vote (never going below zero). A different
/// option gains one vote, creating its bucket if needed, and becomes the user's
/// selection; clicking the current option removes the user from `voters`.
/// The option is not checked against the announcement's declared options.
pub fn toggle_vote(votes: &mut Tallies, voters: &mut VoterMap, user: &str, option: &str) -> Toggle {
    let toggle = Toggle::decide(voters.get(user).map(String::as_str), option);

    if let Some(current) = voters.get(user) {
        if let Some(count) = votes.get_mut(current) {
            if *count > 0 {
                *count -= 1;
            }
        }
    }

    match toggle.selection() {
        Some(selected) => {
            *votes.entry(selected.to_string()).or_insert(0) += 1;
            voters.insert(user.to_string(), selected.to_string());
        }
        None => {
            voters.remove(user);
        }
    }

    toggle
}

/// A zero tally for every declared option.
pub fn zeroed_tallies(options: &[String]) -> Tallies {
    options.iter().map(|option| (option.clone(), 0)).collect()
}

/// Derive the tallies from who voted for what. Declared options always have
/// an entry; votes for undeclared options get their own bucket.
pub fn project_tallies(options: &[String], voters: &VoterMap) -> Tallies {
    let mut votes = zeroed_tallies(options);
    for option in voters.values() {
        *votes.entry(option.clone()).or_insert(0) += 1;
    }
    votes
}

/// Compare tallies, treating a missing bucket as zero. A withdrawn vote for
/// an undeclared option leaves an empty bucket behind that a projection
/// would not have.
pub fn same_counts(a: &Tallies, b: &Tallies) -> bool {
    a.keys()
        .chain(b.keys())
        .all(|k| a.get(k).copied().unwrap_or(0) == b.get(k).copied().unwrap_or(0))
}

/// Mark the announcement as read by `user`. Returns whether anything changed.
pub fn mark_read(reads: &mut ReadMap, user: &str) -> bool {
    let previously = reads.insert(user.to_string(), true);
    previously != Some(true)
}

/// `count` as a percentage of `total`, rounded to the nearest integer with
/// halves rounding up. Zero when there are no votes at all.
pub fn percentage(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * count + total) / (2 * total)) as u32
}

/// Read-only engagement figures for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Tally per option.
    pub votes: Tallies,
    /// Sum of all tallies.
    pub total_votes: u64,
    /// Number of users who marked the announcement read.
    pub total_reads: u64,
    /// Share of the vote per option, in whole percent.
    pub percentages: BTreeMap<String, u32>,
}

impl Engagement {
    pub fn new(votes: Tallies, total_reads: u64) -> Self {
        let total_votes = votes.values().sum();
        let percentages = votes
            .iter()
            .map(|(option, count)| (option.clone(), percentage(*count, total_votes)))
            .collect();
        Self {
            votes,
            total_votes,
            total_reads,
            percentages,
        }
    }

    /// Engagement derived from the full voter and read maps.
    pub fn from_maps(options: &[String], voters: &VoterMap, reads: &ReadMap) -> Self {
        let total_reads = reads.values().filter(|read| **read).count() as u64;
        Self::new(project_tallies(options, voters), total_reads)
    }
}

/// Why a list of vote options was rejected.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("Vote options cannot be blank")]
    Blank,
    #[error("Duplicate vote option: {0}")]
    Duplicate(String),
}

/// Trim the given options and check they are usable: no blanks, no
/// duplicates. An empty list yields [`DEFAULT_OPTIONS`].
pub fn normalise_options(options: Vec<String>) -> Result<Vec<String>, OptionsError> {
    if options.is_empty() {
        return Ok(DEFAULT_OPTIONS.iter().map(|o| o.to_string()).collect());
    }

    let mut seen = HashSet::new();
    options
        .into_iter()
        .map(|option| {
            let option = option.trim().to_string();
            if option.is_empty() {
                Err(OptionsError::Blank)
            } else if !seen.insert(option.clone()) {
                Err(OptionsError::Duplicate(option))
            } else {
                Ok(option)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    fn options() -> Vec<String> {
        DEFAULT_OPTIONS.iter().map(|o| o.to_string()).collect()
    }

    fn tallies(pairs: &[(&str, u64)]) -> Tallies {
        pairs.iter().map(|(o, c)| (o.to_string(), *c)).collect()
    }

    #[test]
    fn vote_unvote_switch() {
        let mut votes = zeroed_tallies(&options());
        let mut voters = VoterMap::new();

        let toggle = toggle_vote(&mut votes, &mut voters, "x@example.com", "agree");
        assert!(matches!(toggle, Toggle::Cast { .. }));
        assert_eq!(votes, tallies(&[("agree", 1), ("oppose", 0)]));
        assert_eq!(voters.get("x@example.com").map(String::as_str), Some("agree"));

        let toggle = toggle_vote(&mut votes, &mut voters, "x@example.com", "agree");
        assert!(matches!(toggle, Toggle::Withdraw { .. }));
        assert_eq!(votes, tallies(&[("agree", 0), ("oppose", 0)]));
        assert!(voters.is_empty());

        let toggle = toggle_vote(&mut votes, &mut voters, "x@example.com", "oppose");
        assert!(matches!(toggle, Toggle::Cast { .. }));
        assert_eq!(votes, tallies(&[("agree", 0), ("oppose", 1)]));
        assert_eq!(voters.get("x@example.com").map(String::as_str), Some("oppose"));
    }

    #[test]
    fn switching_keeps_total() {
        let mut votes = tallies(&[("agree", 3), ("oppose", 2)]);
        let mut voters = VoterMap::from([
            ("a".to_string(), "agree".to_string()),
            ("b".to_string(), "agree".to_string()),
            ("c".to_string(), "agree".to_string()),
            ("d".to_string(), "oppose".to_string()),
            ("e".to_string(), "oppose".to_string()),
        ]);

        let toggle = toggle_vote(&mut votes, &mut voters, "a", "oppose");
        assert_eq!(
            toggle,
            Toggle::Switch {
                from: "agree".to_string(),
                to: "oppose".to_string()
            }
        );
        assert_eq!(votes, tallies(&[("agree", 2), ("oppose", 3)]));
        assert_eq!(votes.values().sum::<u64>(), 5);
    }

    #[test]
    fn reselecting_only_touches_that_option() {
        let mut votes = tallies(&[("agree", 1), ("oppose", 4), ("abstain", 2)]);
        let mut voters = VoterMap::from([("a".to_string(), "abstain".to_string())]);
        let before = votes.clone();

        toggle_vote(&mut votes, &mut voters, "a", "abstain");

        assert_eq!(votes["abstain"], before["abstain"] - 1);
        assert_eq!(votes["agree"], before["agree"]);
        assert_eq!(votes["oppose"], before["oppose"]);
        assert!(!voters.contains_key("a"));
    }

    #[test]
    fn undeclared_option_creates_bucket() {
        let mut votes = zeroed_tallies(&options());
        let mut voters = VoterMap::new();

        toggle_vote(&mut votes, &mut voters, "a", "maybe");

        assert_eq!(votes, tallies(&[("agree", 0), ("maybe", 1), ("oppose", 0)]));
    }

    #[test]
    fn tally_never_goes_negative() {
        // Drifted state: the voter map says "agree" but the tally is already zero.
        let mut votes = tallies(&[("agree", 0), ("oppose", 0)]);
        let mut voters = VoterMap::from([("a".to_string(), "agree".to_string())]);

        toggle_vote(&mut votes, &mut voters, "a", "oppose");

        assert_eq!(votes, tallies(&[("agree", 0), ("oppose", 1)]));
    }

    #[test]
    fn random_toggle_sequences() {
        let users = ["a", "b", "c", "d"];
        let choices = ["agree", "oppose", "abstain"];
        let declared = options();
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..200 {
            let mut votes = zeroed_tallies(&declared);
            let mut voters = VoterMap::new();
            let mut expected: BTreeMap<&str, Option<&str>> = BTreeMap::new();

            for _ in 0..rng.gen_range(1..40) {
                let user = users[rng.gen_range(0..users.len())];
                let choice = choices[rng.gen_range(0..choices.len())];
                let total_before: u64 = votes.values().sum();
                let had_vote = voters.contains_key(user);

                let toggle = toggle_vote(&mut votes, &mut voters, user, choice);

                // Model of the user's selection: re-clicking cancels.
                let slot = expected.entry(user).or_insert(None);
                *slot = if *slot == Some(choice) { None } else { Some(choice) };
                assert_eq!(voters.get(user).map(String::as_str), *slot);
                assert_eq!(toggle.selection(), *slot);

                // Totals move by exactly one on cast/withdraw, not at all on switch.
                let total_after: u64 = votes.values().sum();
                match toggle {
                    Toggle::Cast { .. } => {
                        assert!(!had_vote);
                        assert_eq!(total_after, total_before + 1);
                    }
                    Toggle::Withdraw { .. } => assert_eq!(total_after + 1, total_before),
                    Toggle::Switch { .. } => assert_eq!(total_after, total_before),
                }

                // Incremental tallies always match the projection.
                assert!(same_counts(&votes, &project_tallies(&declared, &voters)));
            }
        }
    }

    #[test]
    fn withdrawn_free_form_vote_leaves_empty_bucket() {
        let declared = options();
        let mut voters = VoterMap::from([("u".to_string(), "maybe".to_string())]);
        let mut votes = project_tallies(&declared, &voters);

        let toggle = toggle_vote(&mut votes, &mut voters, "u", "maybe");
        assert!(matches!(toggle, Toggle::Withdraw { .. }));
        assert_eq!(votes, tallies(&[("agree", 0), ("maybe", 0), ("oppose", 0)]));

        let projected = project_tallies(&declared, &voters);
        assert_eq!(projected, tallies(&[("agree", 0), ("oppose", 0)]));
        assert!(same_counts(&votes, &projected));
        assert!(!same_counts(&tallies(&[("maybe", 1)]), &projected));
    }

    #[test]
    fn different_users_commute() {
        let declared = options();
        let start = VoterMap::from([("a".to_string(), "agree".to_string())]);

        let mut votes_ab = project_tallies(&declared, &start);
        let mut voters_ab = start.clone();
        toggle_vote(&mut votes_ab, &mut voters_ab, "a", "oppose");
        toggle_vote(&mut votes_ab, &mut voters_ab, "b", "agree");

        let mut votes_ba = project_tallies(&declared, &start);
        let mut voters_ba = start;
        toggle_vote(&mut votes_ba, &mut voters_ba, "b", "agree");
        toggle_vote(&mut votes_ba, &mut voters_ba, "a", "oppose");

        assert_eq!(votes_ab, votes_ba);
        assert_eq!(voters_ab, voters_ba);
        assert_eq!(votes_ab, tallies(&[("agree", 1), ("oppose", 1)]));
    }

    #[test]
    fn projection_zero_fills() {
        let declared = vec!["yes".to_string(), "no".to_string(), "later".to_string()];
        let voters = VoterMap::from([
            ("a".to_string(), "yes".to_string()),
            ("b".to_string(), "yes".to_string()),
        ]);
        assert_eq!(
            project_tallies(&declared, &voters),
            tallies(&[("later", 0), ("no", 0), ("yes", 2)])
        );
    }

    #[test]
    fn mark_read_is_idempotent() {
        let mut reads = ReadMap::new();
        assert!(mark_read(&mut reads, "a"));
        let snapshot = reads.clone();
        assert!(!mark_read(&mut reads, "a"));
        assert_eq!(reads, snapshot);
    }

    #[test]
    fn percentages_round_to_nearest() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(3, 3), 100);
    }

    #[test]
    fn engagement_summary() {
        let voters = VoterMap::from([
            ("a".to_string(), "agree".to_string()),
            ("b".to_string(), "agree".to_string()),
            ("c".to_string(), "oppose".to_string()),
        ]);
        let reads = ReadMap::from([
            ("a".to_string(), true),
            ("z".to_string(), true),
            ("y".to_string(), false),
        ]);

        let engagement = Engagement::from_maps(&options(), &voters, &reads);

        assert_eq!(engagement.total_votes, 3);
        assert_eq!(engagement.total_reads, 2);
        assert_eq!(engagement.percentages["agree"], 67);
        assert_eq!(engagement.percentages["oppose"], 33);

        let empty = Engagement::from_maps(&options(), &VoterMap::new(), &ReadMap::new());
        assert_eq!(empty.total_votes, 0);
        assert!(empty.percentages.values().all(|p| *p == 0));
    }

    #[test]
    fn option_normalisation() {
        assert_eq!(normalise_options(vec![]).unwrap(), options());
        assert_eq!(
            normalise_options(vec![" yes ".into(), "no".into()]).unwrap(),
            vec!["yes".to_string(), "no".to_string()]
        );
        assert_eq!(
            normalise_options(vec!["yes".into(), "  ".into()]),
            Err(OptionsError::Blank)
        );
        assert_eq!(
            normalise_options(vec!["yes".into(), "yes ".into()]),
            Err(OptionsError::Duplicate("yes".into()))
        );
    }
}
