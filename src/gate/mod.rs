//! Request gates.
//!
//! Both gates run the same explicit pipeline: read the session, decide whether it
//! names an authenticated user, then branch. They differ in what happens next:
//!
//! - `ApiGate` renews the session before calling the handler and rejects with a
//!   403 envelope.
//! - `SsrGate` never renews and rejects with a temporary redirect to the login
//!   page.
//!
//! Route-level authorization stays outside the gates (`require_route` for API
//! handlers, `render_for` for pages).

mod api;
mod ssr;
mod page;

pub use api::{ApiGate, Caller, Guarded, require_route};
pub use ssr::{SsrGate, PropsLoader, PropsResult, Redirect, UserProps};
pub use page::{PageView, render_for};
