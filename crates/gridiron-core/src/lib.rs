// Library root: season-data import for a football picks database. The CLI
// and the integration tests go through this public API.

pub mod cancel;
pub mod config;
pub mod error;
pub mod import;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod store;
pub mod translate;

pub use cancel::CancelFlag;
pub use import::{ImportError, UploadReport};
pub use store::Database;
