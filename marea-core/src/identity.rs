use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform role carried in access tokens. `Both` marks a guest who has also
/// registered a captain profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Guest,
    Captain,
    Both,
}

impl UserRole {
    pub fn can_captain(&self) -> bool {
        matches!(self, UserRole::Captain | UserRole::Both)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Guest => "GUEST",
            UserRole::Captain => "CAPTAIN",
            UserRole::Both => "BOTH",
        };
        f.write_str(s)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(UserRole::Guest),
            "CAPTAIN" => Ok(UserRole::Captain),
            "BOTH" => Ok(UserRole::Both),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
