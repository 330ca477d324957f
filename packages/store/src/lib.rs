//! # Storage layer for SkillMate
//!
//! Domain models and the [`Store`] abstraction over the four collections the
//! platform persists: users, swaps, feedback, and global notices.
//!
//! All reads and writes go through the [`Store`] trait, so the same domain
//! logic works against the in-memory store (tests, local development) and the
//! PostgreSQL store (production).

pub mod models;
pub mod store;

mod memory;
pub use memory::MemoryStore;

mod postgres;
pub use postgres::PgStore;

pub use models::{
    Feedback, GlobalNotice, Priority, Role, SkillCount, Swap, SwapStatus, User,
};
pub use store::{
    NoticeQuery, Page, Store, StoreError, StoreResult, SwapQuery, UserQuery,
};
