pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod data;
pub mod env;
pub mod error;
pub mod handler;
pub mod http;
pub mod processing;
pub mod storage;

pub use context::RequestContext;
pub use env::Services;
pub use error::{ApiError, ErrorKind};
pub use handler::{build_api, UserApi};
