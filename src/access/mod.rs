//! Route access policy: which access level each protected route needs, and how
//! levels are compared and labelled for display.
//! Tables are plain constant data; `AccessPolicy::new` checks them at startup.

mod level;
mod route;
mod policy;

pub use level::{AccessLevel, LevelBand, LEVEL_BANDS, BASELINE_LABEL};
pub use route::Route;
pub use policy::{AccessPolicy, AuthzDecision, PolicyError, ROUTE_LEVELS};
