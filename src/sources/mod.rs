//! Document sources.
//!
//! Only the local file system is supported: a root directory plus a glob
//! selecting Markdown and PDF files beneath it.

mod local;

pub use local::{DiscoveredFile, LocalSource};
