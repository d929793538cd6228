use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Publishes talent videos
    Talent,
    /// Scouts and contacts talents
    Sponsor,
    General,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Talent => "talent",
            AccountType::Sponsor => "sponsor",
            AccountType::General => "general",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "talent" => Ok(AccountType::Talent),
            "sponsor" => Ok(AccountType::Sponsor),
            "general" => Ok(AccountType::General),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

impl TryFrom<String> for AccountType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An account that can like, favorite and subscribe.
///
/// Credentials live only in the persistence layer and are never loaded here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Viewer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Viewer {
    pub fn new(name: impl Into<String>, email: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            account_type,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }
}
