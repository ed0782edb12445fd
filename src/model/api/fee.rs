use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    db::{Fee, NewFee},
};

/// A management fee to be charged to a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSpec {
    pub room: String,
    pub amount: f64,
    pub due: NaiveDate,
    #[serde(default)]
    pub note: String,
}

impl FeeSpec {
    pub fn into_fee(self) -> Result<NewFee> {
        let room = self.room.trim();
        if room.is_empty() {
            return Err(Error::bad_request("Room is required"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::bad_request("Amount must be positive"));
        }
        Ok(NewFee {
            room: room.to_string(),
            amount: self.amount,
            due: self.due,
            paid: false,
            paid_at: None,
            invoice: String::new(),
            note: self.note,
        })
    }
}

/// Details recorded when a fee is paid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub invoice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeView {
    pub id: ApiId,
    pub room: String,
    pub amount: f64,
    pub due: NaiveDate,
    pub paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub invoice: String,
    pub note: String,
}

impl From<Fee> for FeeView {
    fn from(fee: Fee) -> Self {
        let core = fee.fee;
        Self {
            id: fee.id.into(),
            room: core.room,
            amount: core.amount,
            due: core.due,
            paid: core.paid,
            paid_at: core.paid_at.map(|at| at.to_chrono()),
            invoice: core.invoice,
            note: core.note,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl FeeSpec {
        pub fn example() -> Self {
            Self {
                room: "12F-3".to_string(),
                amount: 1250.0,
                due: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                note: "Q1 management fee".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;

    use super::*;

    #[test]
    fn new_fee_is_unpaid() {
        let fee = FeeSpec::example().into_fee().unwrap();
        assert!(!fee.paid);
        assert_eq!(fee.paid_at, None);
        assert_eq!(fee.invoice, "");
    }

    #[test]
    fn invalid_fees_rejected() {
        let mut spec = FeeSpec::example();
        spec.amount = 0.0;
        assert_eq!(spec.into_fee().unwrap_err().status(), Status::BadRequest);

        let mut spec = FeeSpec::example();
        spec.room = " ".to_string();
        assert_eq!(spec.into_fee().unwrap_err().status(), Status::BadRequest);
    }
}
