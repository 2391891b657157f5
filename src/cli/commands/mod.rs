mod config;
mod index;
mod search;
mod serve;
mod status;

pub use config::ConfigCommand;
pub use index::{ClearArgs, DeleteArgs, IngestArgs};
pub use search::{AskArgs, SearchArgs};
pub use serve::ServeArgs;
pub use status::StatusArgs;

pub use config::handle_config;
pub use index::{handle_clear, handle_delete, handle_ingest};
pub use search::{handle_ask, handle_search};
pub use serve::handle_serve;
pub use status::handle_status;
