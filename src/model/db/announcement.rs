use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::engagement::{ReadMap, VoterMap},
    mongodb::Id,
};

/// Core announcement data, as stored in the database. Votes and read marks
/// live in their own collections, one document per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementCore {
    pub title: String,
    pub content: String,
    /// Publication time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub time: DateTime<Utc>,
    /// Display name of the committee member who posted it.
    pub author: String,
    /// Vote options, in display order.
    pub options: Vec<String>,
}

/// An announcement without an ID.
pub type NewAnnouncement = AnnouncementCore;

/// An announcement from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub announcement: AnnouncementCore,
}

impl Deref for Announcement {
    type Target = AnnouncementCore;

    fn deref(&self) -> &Self::Target {
        &self.announcement
    }
}

impl DerefMut for Announcement {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.announcement
    }
}

/// One user's current vote on one announcement.
/// Unique per `(announcement_id, voter)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementVote {
    pub announcement_id: Id,
    /// Voter's email.
    pub voter: String,
    pub option: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl AnnouncementVote {
    pub fn new(announcement_id: Id, voter: &str, option: &str) -> Self {
        Self {
            announcement_id,
            voter: voter.to_string(),
            option: option.to_string(),
            cast_at: Utc::now(),
        }
    }
}

/// Build the voter map of an announcement from its vote documents.
pub fn voter_map(votes: impl IntoIterator<Item = AnnouncementVote>) -> VoterMap {
    votes
        .into_iter()
        .map(|vote| (vote.voter, vote.option))
        .collect()
}

/// A user has seen an announcement.
/// Unique per `(announcement_id, reader)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRead {
    pub announcement_id: Id,
    /// Reader's email.
    pub reader: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub read_at: DateTime<Utc>,
}

/// Build the read map of an announcement from its read documents.
pub fn read_map(reads: impl IntoIterator<Item = AnnouncementRead>) -> ReadMap {
    reads
        .into_iter()
        .map(|read| (read.reader, true))
        .collect()
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl AnnouncementCore {
        pub fn example() -> Self {
            Self {
                title: "Lift maintenance".to_string(),
                content: "Lift B will be out of service on Saturday morning.".to_string(),
                time: Utc::now(),
                author: "Colin Chair".to_string(),
                options: vec!["agree".to_string(), "oppose".to_string()],
            }
        }

        pub fn example2() -> Self {
            Self {
                title: "Garden party".to_string(),
                content: "Which weekend suits everyone?".to_string(),
                time: Utc::now(),
                author: "Colin Chair".to_string(),
                options: vec!["first".to_string(), "second".to_string(), "third".to_string()],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_from_rows() {
        let id = Id::new();
        let votes = vec![
            AnnouncementVote::new(id, "a@x.org", "agree"),
            AnnouncementVote::new(id, "b@x.org", "oppose"),
        ];
        let voters = voter_map(votes);
        assert_eq!(voters.len(), 2);
        assert_eq!(voters["a@x.org"], "agree");

        let reads = read_map(vec![AnnouncementRead {
            announcement_id: id,
            reader: "a@x.org".to_string(),
            read_at: Utc::now(),
        }]);
        assert_eq!(reads.get("a@x.org"), Some(&true));
        assert_eq!(reads.get("b@x.org"), None);
    }
}
