//! Core session components
//!
//! This module contains the session controller and the persisted history it
//! owns.

mod memory;
mod session;

pub use memory::SqliteHistoryStore;
pub use session::{SessionController, SessionSnapshot};
