use std::ops::Deref;

use chrono::NaiveDate;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core management fee data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCore {
    pub room: String,
    pub amount: f64,
    /// Due date, stored as `YYYY-MM-DD`.
    pub due: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<DateTime>,
    /// Invoice or receipt number.
    pub invoice: String,
    pub note: String,
}

/// A fee without an ID.
pub type NewFee = FeeCore;

/// A fee from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fee {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub fee: FeeCore,
}

impl Deref for Fee {
    type Target = FeeCore;

    fn deref(&self) -> &Self::Target {
        &self.fee
    }
}
