//! lessonquiz-client: reaching a remote grading service.
//!
//! Implements `GradeTransport` over HTTP, loads client configuration, and
//! provides a scripted mock transport for tests.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{load_config, load_config_from, ClientConfig};
pub use http::HttpTransport;
pub use mock::MockTransport;
