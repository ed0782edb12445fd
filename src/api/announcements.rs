use std::collections::BTreeMap;

use log::{debug, info};
use mongodb::{
    bson::{doc, DateTime},
    options::UpdateOptions,
    Client,
};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            announcement::{AnnouncementSpec, AnnouncementView, VoteRequest},
            auth::{AuthToken, Committee, Member},
        },
        common::engagement::{
            mark_read, project_tallies, same_counts, toggle_vote, ReadMap, Toggle, VoterMap,
        },
        db::{
            announcement::{read_map, voter_map},
            Announcement, AnnouncementRead, AnnouncementVote,
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

use super::common::{newest_first, page_limit, search_filter};

/// How many times a vote is re-decided when the voter's own row changes
/// underneath it.
const VOTE_ATTEMPTS: usize = 3;

pub fn routes() -> Vec<Route> {
    routes![
        list_announcements,
        get_announcement,
        create_announcement,
        modify_announcement,
        delete_announcement,
        vote,
        read,
        get_voters,
    ]
}

#[get("/announcements?<limit>&<search>")]
async fn list_announcements(
    token: Option<AuthToken<Member>>,
    limit: Option<u32>,
    search: Option<&str>,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
) -> Result<Json<Vec<AnnouncementView>>> {
    let filter = search_filter(&["title", "content"], search);
    let list: Vec<Announcement> = announcements
        .find(filter, newest_first("time", page_limit(limit)?))
        .await?
        .try_collect()
        .await?;

    // Fetch engagement for the whole page at once.
    let ids: Vec<Id> = list.iter().map(|announcement| announcement.id).collect();
    let on_page = doc! { "announcement_id": { "$in": ids } };
    let mut voters: BTreeMap<Id, VoterMap> = BTreeMap::new();
    let mut vote_rows = votes.find(on_page.clone(), None).await?;
    while let Some(vote) = vote_rows.try_next().await? {
        voters
            .entry(vote.announcement_id)
            .or_default()
            .insert(vote.voter, vote.option);
    }
    let mut readers: BTreeMap<Id, ReadMap> = BTreeMap::new();
    let mut read_rows = reads.find(on_page, None).await?;
    while let Some(read) = read_rows.try_next().await? {
        readers
            .entry(read.announcement_id)
            .or_default()
            .insert(read.reader, true);
    }

    let viewer = token.as_ref().map(|token| token.email.as_str());
    let views = list
        .into_iter()
        .map(|announcement| {
            let id = announcement.id;
            AnnouncementView::new(
                announcement,
                voters.get(&id).unwrap_or(&VoterMap::new()),
                readers.get(&id).unwrap_or(&ReadMap::new()),
                viewer,
            )
        })
        .collect();
    Ok(Json(views))
}

#[get("/announcements/<announcement_id>")]
async fn get_announcement(
    token: Option<AuthToken<Member>>,
    announcement_id: Id,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
) -> Result<Json<AnnouncementView>> {
    let announcement = get_by_id(&announcements, announcement_id).await?;
    let voters = load_voters(&votes, announcement_id).await?;
    let readers = load_readers(&reads, announcement_id).await?;
    let viewer = token.as_ref().map(|token| token.email.as_str());
    Ok(Json(AnnouncementView::new(
        announcement,
        &voters,
        &readers,
        viewer,
    )))
}

#[post("/announcements", data = "<spec>", format = "json")]
async fn create_announcement(
    token: AuthToken<Committee>,
    spec: Json<AnnouncementSpec>,
    announcements: Coll<Announcement>,
) -> Result<Json<AnnouncementView>> {
    let announcement = Announcement {
        id: Id::new(),
        announcement: spec.0.into_announcement(&token.name)?,
    };
    announcements.insert_one(&announcement, None).await?;
    info!(
        "{} published announcement {}: {}",
        token.email, announcement.id, announcement.title
    );

    let view = AnnouncementView::new(
        announcement,
        &VoterMap::new(),
        &ReadMap::new(),
        Some(&token.email),
    );
    Ok(Json(view))
}

/// Replace the title, content and options. Votes for options that no longer
/// exist are discarded.
#[put("/announcements/<announcement_id>", data = "<spec>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn modify_announcement(
    token: AuthToken<Committee>,
    announcement_id: Id,
    spec: Json<AnnouncementSpec>,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
    db_client: &State<Client>,
) -> Result<Json<AnnouncementView>> {
    let mut announcement = get_by_id(&announcements, announcement_id).await?;
    let edited = spec.0.into_announcement(&announcement.author)?;
    announcement.title = edited.title;
    announcement.content = edited.content;
    announcement.options = edited.options;

    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        announcements
            .replace_one_with_session(
                announcement_id.as_doc(),
                &announcement,
                None,
                &mut session,
            )
            .await?;

        let stale = doc! {
            "announcement_id": announcement_id,
            "option": { "$nin": &announcement.options },
        };
        let pruned = votes
            .delete_many_with_session(stale, None, &mut session)
            .await?
            .deleted_count;

        session.commit_transaction().await?;
        info!(
            "{} edited announcement {announcement_id}, discarding {pruned} votes",
            token.email
        );
    }

    let voters = load_voters(&votes, announcement_id).await?;
    let readers = load_readers(&reads, announcement_id).await?;
    Ok(Json(AnnouncementView::new(
        announcement,
        &voters,
        &readers,
        Some(&token.email),
    )))
}

#[delete("/announcements/<announcement_id>")]
async fn delete_announcement(
    token: AuthToken<Committee>,
    announcement_id: Id,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
    db_client: &State<Client>,
) -> Result<()> {
    // Check it exists first, so a bad ID is a 404 rather than a no-op.
    get_by_id(&announcements, announcement_id).await?;

    // Atomically delete the announcement and all its engagement.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        announcements
            .delete_one_with_session(announcement_id.as_doc(), None, &mut session)
            .await?;
        let filter = doc! {
            "announcement_id": announcement_id,
        };
        votes
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        reads
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    info!("{} deleted announcement {announcement_id}", token.email);
    Ok(())
}

/// Vote for an option, or withdraw the vote by choosing the same option again.
#[post("/announcements/<announcement_id>/vote", data = "<request>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn vote(
    token: AuthToken<Member>,
    announcement_id: Id,
    request: Json<VoteRequest>,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
    config: &State<Config>,
) -> Result<Json<AnnouncementView>> {
    let announcement = get_by_id(&announcements, announcement_id).await?;

    let option = request.option.trim();
    if option.is_empty() {
        return Err(Error::bad_request("Vote option cannot be blank"));
    }
    if config.strict_vote_options() && !announcement.options.iter().any(|o| o == option) {
        return Err(Error::bad_request(format!(
            "Announcement {announcement_id} has no option {option:?}"
        )));
    }

    let (toggle, voters) = record_vote(&votes, &announcement, &token.email, option).await?;
    match &toggle {
        Toggle::Cast { option } => info!("{} voted {option} on {announcement_id}", token.email),
        Toggle::Switch { from, to } => info!(
            "{} changed vote on {announcement_id} from {from} to {to}",
            token.email
        ),
        Toggle::Withdraw { option } => info!(
            "{} withdrew vote {option} on {announcement_id}",
            token.email
        ),
    }

    let readers = load_readers(&reads, announcement_id).await?;
    Ok(Json(AnnouncementView::new(
        announcement,
        &voters,
        &readers,
        Some(&token.email),
    )))
}

/// Mark the announcement as seen by the caller. Marking twice is a no-op.
#[post("/announcements/<announcement_id>/read")]
async fn read(
    token: AuthToken<Member>,
    announcement_id: Id,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
    reads: Coll<AnnouncementRead>,
) -> Result<Json<AnnouncementView>> {
    let announcement = get_by_id(&announcements, announcement_id).await?;
    let mut readers = load_readers(&reads, announcement_id).await?;

    // Only ever inserts, so an existing mark keeps its original time.
    let mine = doc! {
        "announcement_id": announcement_id,
        "reader": &token.email,
    };
    let update = doc! {
        "$setOnInsert": {
            "read_at": DateTime::now(),
        }
    };
    let upsert = UpdateOptions::builder().upsert(true).build();
    match reads.update_one(mine, update, upsert).await {
        Ok(_) => {}
        // A concurrent mark by the same user got there first.
        Err(e) if is_duplicate_key_error(&e) => {}
        Err(e) => return Err(e.into()),
    }

    if mark_read(&mut readers, &token.email) {
        debug!("{} read announcement {announcement_id}", token.email);
    }

    let voters = load_voters(&votes, announcement_id).await?;
    Ok(Json(AnnouncementView::new(
        announcement,
        &voters,
        &readers,
        Some(&token.email),
    )))
}

/// Who voted for what.
#[get("/announcements/<announcement_id>/voters")]
async fn get_voters(
    _token: AuthToken<Committee>,
    announcement_id: Id,
    announcements: Coll<Announcement>,
    votes: Coll<AnnouncementVote>,
) -> Result<Json<VoterMap>> {
    get_by_id(&announcements, announcement_id).await?;
    Ok(Json(load_voters(&votes, announcement_id).await?))
}

async fn get_by_id(announcements: &Coll<Announcement>, id: Id) -> Result<Announcement> {
    announcements
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Announcement {id}")))
}

async fn load_voters(votes: &Coll<AnnouncementVote>, id: Id) -> Result<VoterMap> {
    let rows: Vec<AnnouncementVote> = votes
        .find(doc! { "announcement_id": id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(voter_map(rows))
}

async fn load_readers(reads: &Coll<AnnouncementRead>, id: Id) -> Result<ReadMap> {
    let rows: Vec<AnnouncementRead> = reads
        .find(doc! { "announcement_id": id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(read_map(rows))
}

/// Apply a vote by `voter` to their row for this announcement.
///
/// The toggle is decided against the current voter map, then written with a
/// condition on the row's prior state. If the row changed in between, the
/// vote is re-decided, up to [`VOTE_ATTEMPTS`] times. Other users' votes live
/// in other rows and are never touched.
///
/// Returns the decision and the voter map with it applied.
async fn record_vote(
    votes: &Coll<AnnouncementVote>,
    announcement: &Announcement,
    voter: &str,
    option: &str,
) -> Result<(Toggle, VoterMap)> {
    let id = announcement.id;
    let mine = doc! {
        "announcement_id": id,
        "voter": voter,
    };

    for attempt in 1..=VOTE_ATTEMPTS {
        let mut voters = load_voters(votes, id).await?;
        let mut tallies = project_tallies(&announcement.options, &voters);
        let toggle = toggle_vote(&mut tallies, &mut voters, voter, option);
        debug_assert!(same_counts(
            &tallies,
            &project_tallies(&announcement.options, &voters)
        ));

        let applied = match &toggle {
            Toggle::Cast { option } => {
                let row = AnnouncementVote::new(id, voter, option);
                match votes.insert_one(row, None).await {
                    Ok(_) => true,
                    Err(e) if is_duplicate_key_error(&e) => false,
                    Err(e) => return Err(e.into()),
                }
            }
            Toggle::Switch { from, to } => {
                let mut filter = mine.clone();
                filter.insert("option", from);
                let update = doc! {
                    "$set": {
                        "option": to,
                        "cast_at": DateTime::now(),
                    }
                };
                votes.update_one(filter, update, None).await?.modified_count == 1
            }
            Toggle::Withdraw { option } => {
                let mut filter = mine.clone();
                filter.insert("option", option);
                votes.delete_one(filter, None).await?.deleted_count == 1
            }
        };

        if applied {
            return Ok((toggle, voters));
        }
        debug!("Vote by {voter} on {id} changed concurrently (attempt {attempt})");
    }

    Err(Error::Status(
        Status::Conflict,
        format!("Vote on announcement {id} kept changing, try again"),
    ))
}
