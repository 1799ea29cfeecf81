//! Typed client for codeforces: the json api (`api`), the logged-in html
//! session and submissions (`judge`), and problem pages (`parser`).

pub mod api;
pub mod config;
pub mod error;
pub mod judge;
pub mod parser;
pub(crate) mod random;
pub mod transport;

pub use api::ApiClient;
pub use config::{ClientConfig, Credentials};
pub use error::{Category, Error, Kind, Result};
pub use judge::{AuthSession, SubmissionEngine};
pub use parser::PageParser;
