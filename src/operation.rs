use std::str::FromStr;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::Error;

/// What to do for each service account in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, Serialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a new key and make it the only enabled secret version.
    Create,
    /// Delete keys that don't match the latest secret version.
    Delete,
    /// `Create` followed by `Delete`.
    All,
}

impl Operation {
    pub fn parse(input: &str) -> Result<Self, Error> {
        Self::from_str(input.trim()).map_err(|_| {
            Error::invalid_parameter(format!(
                "unknown operation {input:?}, expected one of create, delete, all"
            ))
        })
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            Self::Create => "Key creation process completed successfully",
            Self::Delete => "Key deletion process completed successfully",
            Self::All => "All operations (create and delete) completed successfully",
        }
    }
}
