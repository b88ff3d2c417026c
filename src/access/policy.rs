use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use super::level::{band_label, AccessLevel, LevelBand, LEVEL_BANDS};
use super::route::Route;

/// Minimum level per route. Kept next to `LEVEL_BANDS` but independent of it.
pub const ROUTE_LEVELS: &[(Route, AccessLevel)] = &[
    (Route::Sessions, AccessLevel::DISPO),
    (Route::Temps, AccessLevel::IDL),
    (Route::Employees, AccessLevel::SL),
    (Route::Regions, AccessLevel::DISPO),
    (Route::Stations, AccessLevel::DISPO),
    (Route::StationsNew, AccessLevel::VERWALTUNG),
    (Route::Users, AccessLevel::ADMIN),
    (Route::UsersAllowedStations, AccessLevel::ADMIN),
];

/// Defects in the policy tables. Never a user-facing authorization outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("route '{0}' has no required access level")]
    MissingRoute(Route),
    #[error("route '{0}' is listed more than once")]
    DuplicateRoute(Route),
    #[error("unknown route identifier '{0}'")]
    UnknownRoute(String),
    #[error("level bands must be ordered highest threshold first")]
    UnorderedBands,
    #[error("level band at {0} has a blank label")]
    BlankLabel(AccessLevel),
}

/// Outcome of one authorization check. Computed per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthzDecision {
    pub granted: bool,
    pub route: Route,
    pub required_level: AccessLevel,
    pub actual_level: Option<AccessLevel>,
    pub label: &'static str,
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    routes: BTreeMap<Route, AccessLevel>,
    bands: Vec<LevelBand>,
}

impl AccessPolicy {
    /// Build a policy and verify that every known route appears exactly once.
    pub fn new(routes: &[(Route, AccessLevel)], bands: &[LevelBand]) -> Result<Self, PolicyError> {
        let mut map = BTreeMap::new();
        for (route, level) in routes {
            if map.insert(*route, *level).is_some() {
                return Err(PolicyError::DuplicateRoute(*route));
            }
        }
        if let Some(missing) = Route::ALL.iter().find(|r| !map.contains_key(*r)) {
            return Err(PolicyError::MissingRoute(*missing));
        }
        if bands.windows(2).any(|w| w[0].min <= w[1].min) {
            return Err(PolicyError::UnorderedBands);
        }
        if let Some(band) = bands.iter().find(|b| b.label.trim().is_empty()) {
            return Err(PolicyError::BlankLabel(band.min));
        }
        Ok(Self { routes: map, bands: bands.to_vec() })
    }

    /// The application's built-in tables.
    pub fn standard() -> Result<Self, PolicyError> {
        Self::new(ROUTE_LEVELS, LEVEL_BANDS)
    }

    pub fn required_level(&self, route: Route) -> Result<AccessLevel, PolicyError> {
        self.routes.get(&route).copied().ok_or(PolicyError::MissingRoute(route))
    }

    /// Same as `required_level`, keyed by the route's string identifier.
    pub fn required_level_for(&self, id: &str) -> Result<AccessLevel, PolicyError> {
        let route = Route::from_id(id).ok_or_else(|| PolicyError::UnknownRoute(id.to_string()))?;
        self.required_level(route)
    }

    /// `level >= required_level(route)`. Absent level or route denies.
    pub fn is_authorized(&self, level: Option<AccessLevel>, route: Option<Route>) -> bool {
        let (Some(level), Some(route)) = (level, route) else { return false; };
        match self.required_level(route) {
            Ok(required) => level >= required,
            Err(e) => {
                tracing::error!(target: "dispo::access", "{e}");
                false
            }
        }
    }

    pub fn label_for(&self, level: Option<AccessLevel>) -> &'static str {
        band_label(&self.bands, level)
    }

    pub fn decide(&self, level: Option<AccessLevel>, route: Route) -> Result<AuthzDecision, PolicyError> {
        let required_level = self.required_level(route)?;
        Ok(AuthzDecision {
            granted: level.is_some_and(|l| l >= required_level),
            route,
            required_level,
            actual_level: level,
            label: self.label_for(level),
        })
    }

    pub fn routes(&self) -> impl Iterator<Item = (Route, AccessLevel)> + '_ {
        self.routes.iter().map(|(r, l)| (*r, *l))
    }
}
