//! # API crate — SkillMate domain logic
//!
//! Everything between the HTTP handlers and the storage layer lives here.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Password hashing (argon2), signed bearer tokens, session key |
//! | [`accounts`] | Registration, login, profile edits, push-token management |
//! | [`swaps`] | The swap request ledger: create, self-service transitions, admin overrides, listings |
//! | [`feedback`] | Post-swap ratings |
//! | [`notify`] | Best-effort push notification dispatch |
//! | [`moderation`] | Admin operations: ban/unban, skill removal, broadcasts, direct pushes |
//! | [`reports`] | Read-side aggregation reports in JSON or CSV |
//! | [`error`] | The error taxonomy and its HTTP mapping |
//!
//! Every operation takes the storage backend as `&dyn Store`, so the whole
//! crate is exercised in tests against the in-memory store.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod feedback;
pub mod moderation;
pub mod notify;
pub mod reports;
pub mod swaps;

pub use error::{ApiError, ApiResult};
pub use notify::Dispatcher;
