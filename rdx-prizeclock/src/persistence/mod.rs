//! Durable session snapshots: silent autosave/restore and user export/import
//! share one JSON format.

mod error;
mod format;
mod io;

pub use error::{PersistenceError, Result};
pub use format::{OptionRecord, SessionFile};
pub use io::{load_session, load_session_async, save_session, save_session_async};
