use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::engagement::{normalise_options, Engagement, ReadMap, VoterMap},
    db::{Announcement, NewAnnouncement},
};

/// An announcement as submitted by the committee, for creation or editing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementSpec {
    pub title: String,
    pub content: String,
    /// Vote options; defaults to agree/oppose when empty.
    #[serde(default)]
    pub options: Vec<String>,
}

impl AnnouncementSpec {
    /// Validate the spec and build an announcement published now.
    pub fn into_announcement(self, author: &str) -> Result<NewAnnouncement> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(Error::bad_request("Title and content are required"));
        }
        let options =
            normalise_options(self.options).map_err(|e| Error::bad_request(e.to_string()))?;

        Ok(NewAnnouncement {
            title: title.to_string(),
            content: content.to_string(),
            time: Utc::now(),
            author: author.to_string(),
            options,
        })
    }
}

/// A vote for one option of an announcement. Voting for the option already
/// chosen withdraws the vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option: String,
}

/// An announcement with its engagement figures. Caller-specific fields are
/// only present for authenticated callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementView {
    pub id: ApiId,
    pub title: String,
    pub content: String,
    pub time: DateTime<Utc>,
    pub author: String,
    pub options: Vec<String>,
    #[serde(flatten)]
    pub engagement: Engagement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl AnnouncementView {
    /// Project the view from the announcement and its vote and read maps,
    /// as seen by `viewer` (if logged in).
    pub fn new(
        announcement: Announcement,
        voters: &VoterMap,
        reads: &ReadMap,
        viewer: Option<&str>,
    ) -> Self {
        let engagement = Engagement::from_maps(&announcement.options, voters, reads);
        let my_vote = viewer.and_then(|user| voters.get(user).cloned());
        let read = viewer.map(|user| reads.get(user).copied().unwrap_or(false));
        let core = announcement.announcement;
        Self {
            id: announcement.id.into(),
            title: core.title,
            content: core.content,
            time: core.time,
            author: core.author,
            options: core.options,
            engagement,
            my_vote,
            read,
        }
    }
}
