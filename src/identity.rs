//! Service-account identities.
//!
//! An identity is a service-account email of the form
//! `name@project-id.suffix`. The name doubles as the secret that holds the
//! account's current key, and the project is where that secret lives.

use std::fmt;

use pom::utf8::{end, one_of, sym, Parser};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A parsed service-account email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceAccount {
    email: String,
    project_id: String,
    secret_id: String,
}

/// Characters allowed in account names and project IDs.
const ID_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789-";

/// Characters allowed in the domain suffix.
const DOMAIN_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789-.";

fn email<'a>() -> Parser<'a, (&'a str, &'a str)> {
    let name = one_of(ID_CHARS).repeat(1..).collect();
    let project = one_of(ID_CHARS).repeat(1..).collect();
    let suffix = one_of(DOMAIN_CHARS).repeat(1..);

    name - sym('@') + project - sym('.') - suffix - end()
}

impl ServiceAccount {
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();

        let (secret_id, project_id) = email()
            .parse_str(input)
            .map_err(|e| Error::invalid_identity(input, format!("{e}")))?;

        Ok(Self {
            email: input.to_owned(),
            project_id: project_id.to_owned(),
            secret_id: secret_id.to_owned(),
        })
    }

    /// Parses every identity in a batch, failing on the first malformed one.
    pub fn parse_all<I, S>(inputs: I) -> Result<Vec<Self>, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|input| Self::parse(input.as_ref()))
            .collect()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    /// IAM resource name. The `-` wildcard lets IAM infer the project.
    pub fn resource_name(&self) -> String {
        format!("projects/-/serviceAccounts/{}", self.email)
    }

    /// Secret Manager resource name of the secret holding this account's key.
    pub fn secret_name(&self) -> String {
        format!("projects/{}/secrets/{}", self.project_id, self.secret_id)
    }
}

impl fmt::Display for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

impl TryFrom<String> for ServiceAccount {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServiceAccount> for String {
    fn from(value: ServiceAccount) -> Self {
        value.email
    }
}
