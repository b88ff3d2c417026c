//! Session identity for gated requests.
//! The gates only talk to `SessionStore`; `MemorySessionStore` is the in-process
//! implementation used by the server binary and the tests.

mod user;
mod session;
mod store;
mod request_context;

pub use user::User;
pub use session::{Session, SessionToken, MemorySessionStore};
pub use store::{SessionStore, StoreError};
pub use request_context::RequestContext;
