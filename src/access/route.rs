use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Closed set of protected pages and API routes, used only as policy keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Route {
    #[serde(rename = "sessions")]
    Sessions,
    #[serde(rename = "temps")]
    Temps,
    #[serde(rename = "employees")]
    Employees,
    #[serde(rename = "regions")]
    Regions,
    #[serde(rename = "stations")]
    Stations,
    #[serde(rename = "stations/new")]
    StationsNew,
    #[serde(rename = "users")]
    Users,
    #[serde(rename = "users/allowed-stations")]
    UsersAllowedStations,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Sessions,
        Route::Temps,
        Route::Employees,
        Route::Regions,
        Route::Stations,
        Route::StationsNew,
        Route::Users,
        Route::UsersAllowedStations,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Route::Sessions => "sessions",
            Route::Temps => "temps",
            Route::Employees => "employees",
            Route::Regions => "regions",
            Route::Stations => "stations",
            Route::StationsNew => "stations/new",
            Route::Users => "users",
            Route::UsersAllowedStations => "users/allowed-stations",
        }
    }

    /// Lookup by identifier; anything outside the closed set is `None`.
    pub fn from_id(id: &str) -> Option<Route> {
        Route::ALL.iter().copied().find(|r| r.id() == id)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::from_id(s).ok_or_else(|| format!("unknown route '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for r in Route::ALL {
            assert_eq!(Route::from_id(r.id()), Some(r));
            assert_eq!(r.to_string().parse::<Route>().unwrap(), r);
        }
    }

    #[test]
    fn paths_are_not_route_ids() {
        assert_eq!(Route::from_id("/users"), None);
        assert_eq!(Route::from_id("Users"), None);
        assert_eq!(Route::from_id(""), None);
    }

    #[test]
    fn serde_uses_route_ids() {
        assert_eq!(serde_json::to_string(&Route::StationsNew).unwrap(), "\"stations/new\"");
        let r: Route = serde_json::from_str("\"users/allowed-stations\"").unwrap();
        assert_eq!(r, Route::UsersAllowedStations);
    }
}
