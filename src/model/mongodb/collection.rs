use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    Announcement, AnnouncementRead, AnnouncementVote, Emergency, Fee, Meeting, NewAnnouncement,
    NewEmergency, NewFee, NewMeeting, NewPackage, NewProfile, NewResident, NewTicket, NewVisitor,
    Package, Profile, Resident, Ticket, Visitor,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

/// Implement [`MongoCollection`] for each listed type, all sharing one collection.
macro_rules! collection {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("profiles" => Profile, NewProfile);
collection!("announcements" => Announcement, NewAnnouncement);
collection!("announcement_votes" => AnnouncementVote);
collection!("announcement_reads" => AnnouncementRead);
collection!("maintenance" => Ticket, NewTicket);
collection!("fees" => Fee, NewFee);
collection!("residents" => Resident, NewResident);
collection!("visitors" => Visitor, NewVisitor);
collection!("packages" => Package, NewPackage);
collection!("meetings" => Meeting, NewMeeting);
collection!("emergencies" => Emergency, NewEmergency);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Profiles are looked up by (lower-cased) email.
    let profile_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Profile>::from_db(db)
        .create_index(profile_index, None)
        .await?;

    // Announcements are listed newest first.
    let announcement_index = IndexModel::builder().keys(doc! {"time": -1}).build();
    Coll::<Announcement>::from_db(db)
        .create_index(announcement_index, None)
        .await?;

    // At most one vote per user per announcement.
    let vote_index = IndexModel::builder()
        .keys(doc! {"announcement_id": 1, "voter": 1})
        .options(unique.clone())
        .build();
    Coll::<AnnouncementVote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // At most one read mark per user per announcement.
    let read_index = IndexModel::builder()
        .keys(doc! {"announcement_id": 1, "reader": 1})
        .options(unique)
        .build();
    Coll::<AnnouncementRead>::from_db(db)
        .create_index(read_index, None)
        .await?;

    // Tickets are listed newest first and counted by status.
    let ticket_index = IndexModel::builder()
        .keys(doc! {"status": 1, "time": -1})
        .build();
    Coll::<Ticket>::from_db(db)
        .create_index(ticket_index, None)
        .await?;

    Ok(())
}
