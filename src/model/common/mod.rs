//! Types shared between the API and the database.

pub mod engagement;

mod phone;
pub use phone::Phone;

mod role;
pub use role::Role;

mod ticket;
pub use ticket::TicketStatus;
