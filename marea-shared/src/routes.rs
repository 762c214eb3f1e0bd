use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three fixed itineraries a live ride can run.
///
/// Wire names keep the legacy `RUMBO_*` spelling used by stored rows and
/// existing clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Route {
    #[serde(rename = "RUMBO_1")]
    Rumbo1,
    #[serde(rename = "RUMBO_2")]
    Rumbo2,
    #[serde(rename = "RUMBO_3")]
    Rumbo3,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Rumbo1, Route::Rumbo2, Route::Rumbo3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Rumbo1 => "RUMBO_1",
            Route::Rumbo2 => "RUMBO_2",
            Route::Rumbo3 => "RUMBO_3",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUMBO_1" => Ok(Route::Rumbo1),
            "RUMBO_2" => Ok(Route::Rumbo2),
            "RUMBO_3" => Ok(Route::Rumbo3),
            other => Err(UnknownRoute(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoute(pub String);

impl fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown route: {}", self.0)
    }
}

impl std::error::Error for UnknownRoute {}
