//! User accounts and login sessions.

mod service;
mod sqlite_store;
mod store;
mod types;

pub use service::{AccountError, AccountService};
pub use sqlite_store::SqliteUserStore;
pub use store::{UserStore, UserStoreError};
pub use types::*;
