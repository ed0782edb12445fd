//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod announcement;
pub use announcement::{Announcement, AnnouncementRead, AnnouncementVote, NewAnnouncement};

mod fee;
pub use fee::{Fee, FeeCore, NewFee};

pub mod profile;
pub use profile::{ensure_committee_exists, NewProfile, Profile};

mod registry;
pub use registry::{
    Emergency, EmergencyCore, Meeting, MeetingCore, NewEmergency, NewMeeting, NewPackage,
    NewResident, NewVisitor, Package, PackageCore, Resident, ResidentCore, Visitor, VisitorCore,
};

mod ticket;
pub use ticket::{NewTicket, Ticket, TicketCore, TicketLog};
