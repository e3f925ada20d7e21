use async_trait::async_trait;

use super::{RecordStream, UserApi};
use crate::context::RequestContext;
use crate::data::record::{ListQuery, Record, RecordList};
use crate::error::ApiError;

/// Syntactic checks only. Nothing here looks at identity or storage.
pub struct ValidationLayer {
    next: Box<dyn UserApi>,
    max_count: i64,
}

impl ValidationLayer {
    pub fn new(next: Box<dyn UserApi>, max_count: i64) -> Self {
        Self {
            next,
            max_count: max_count.max(1),
        }
    }

    /// Reject negative ranges; a zero or oversized count becomes the maximum.
    fn normalize(&self, query: ListQuery) -> Result<ListQuery, ApiError> {
        if query.offset < 0 {
            return Err(ApiError::bad_input("offset must not be negative"));
        }
        if query.count < 0 {
            return Err(ApiError::bad_input("count must not be negative"));
        }

        let count = if query.count == 0 || query.count > self.max_count {
            self.max_count
        } else {
            query.count
        };
        Ok(ListQuery::new(query.offset, count))
    }
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::bad_input("record id is required"));
    }
    Ok(())
}

#[async_trait]
impl UserApi for ValidationLayer {
    async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::bad_input("login and password are required"));
        }
        self.next.login(ctx, username, password).await
    }

    async fn add_users(
        &self,
        ctx: &RequestContext,
        input: Option<RecordStream>,
    ) -> Result<(), ApiError> {
        if input.is_none() {
            return Err(ApiError::bad_input("record stream is required"));
        }
        self.next.add_users(ctx, input).await
    }

    async fn delete_user(&self, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
        require_id(id)?;
        self.next.delete_user(ctx, id).await
    }

    async fn get_user(&self, ctx: &RequestContext, id: &str) -> Result<Record, ApiError> {
        require_id(id)?;
        self.next.get_user(ctx, id).await
    }

    async fn get_user_list(
        &self,
        ctx: &RequestContext,
        query: ListQuery,
    ) -> Result<RecordList, ApiError> {
        let query = self.normalize(query)?;
        self.next.get_user_list(ctx, query).await
    }

    async fn update_user(
        &self,
        ctx: &RequestContext,
        id: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        require_id(id)?;
        if content.trim().is_empty() {
            return Err(ApiError::bad_input("record content is required"));
        }
        self.next.update_user(ctx, id, content).await
    }
}
