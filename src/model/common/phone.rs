use std::{ops::Deref, str::FromStr};

use phonenumber::{Mode, PhoneNumber};
use serde::{Deserialize, Serialize};

/// A validated phone number, stored and displayed in E.164 form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone {
    inner: PhoneNumber,
}

impl Deref for Phone {
    type Target = PhoneNumber;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Phone {
    /// The number in E.164 form, as SMS gateways expect it.
    pub fn e164(&self) -> String {
        self.inner.format().mode(Mode::E164).to_string()
    }
}

impl FromStr for Phone {
    type Err = phonenumber::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Phone {
            inner: phonenumber::parse(None, s)?,
        })
    }
}

impl TryFrom<String> for Phone {
    type Error = phonenumber::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.e164()
    }
}
