mod clear;
mod config;
mod ingest;
mod status;

pub use config::ConfigCommand;
pub use ingest::IngestArgs;

pub use clear::handle_clear;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use status::handle_status;
