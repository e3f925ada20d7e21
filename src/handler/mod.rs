// User operations, served by three stacked layers:
// validation -> access control -> execution
//
// Each layer implements the full `UserApi` contract and calls the next one
// only after its own checks pass.

pub mod acl;
pub mod execution;
pub mod validation;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::context::RequestContext;
use crate::data::record::{ListQuery, Record, RecordList};
use crate::env::Services;
use crate::error::ApiError;

pub use acl::AclLayer;
pub use execution::ExecutionLayer;
pub use validation::ValidationLayer;

/// Bulk input for [`UserApi::add_users`]: a byte stream holding one JSON array.
pub type RecordStream = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait UserApi: Send + Sync {
    /// Check credentials. Succeeds only when `password` matches `username`.
    async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError>;

    /// Ingest every record of the stream. Per-record failures are logged;
    /// only a failure of the stream itself is returned.
    async fn add_users(
        &self,
        ctx: &RequestContext,
        input: Option<RecordStream>,
    ) -> Result<(), ApiError>;

    async fn delete_user(&self, ctx: &RequestContext, id: &str) -> Result<(), ApiError>;

    async fn get_user(&self, ctx: &RequestContext, id: &str) -> Result<Record, ApiError>;

    async fn get_user_list(
        &self,
        ctx: &RequestContext,
        query: ListQuery,
    ) -> Result<RecordList, ApiError>;

    /// Replace the record `id` with `content`, a JSON object
    async fn update_user(
        &self,
        ctx: &RequestContext,
        id: &str,
        content: &str,
    ) -> Result<(), ApiError>;
}

/// Assemble the full pipeline over `services`.
pub fn build_api(services: Arc<Services>) -> Box<dyn UserApi> {
    let max_count = services.list_max_count;
    let require_admin_for_add_users = services.require_admin_for_add_users;

    let execution = ExecutionLayer::new(services);
    let acl = AclLayer::new(Box::new(execution), require_admin_for_add_users);
    Box::new(ValidationLayer::new(Box::new(acl), max_count))
}
