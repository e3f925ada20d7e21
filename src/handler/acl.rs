use async_trait::async_trait;

use super::{RecordStream, UserApi};
use crate::context::RequestContext;
use crate::data::record::{ListQuery, Record, RecordList};
use crate::error::ApiError;

/// Identity and ownership checks. A user may only touch their own record;
/// the admin may touch any.
pub struct AclLayer {
    next: Box<dyn UserApi>,
    require_admin_for_add_users: bool,
}

impl AclLayer {
    pub fn new(next: Box<dyn UserApi>, require_admin_for_add_users: bool) -> Self {
        Self {
            next,
            require_admin_for_add_users,
        }
    }

    fn check_owner(ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
        let Some(identity) = ctx.identity() else {
            return Err(ApiError::forbidden("authentication required"));
        };
        if identity != id && !ctx.is_admin() {
            tracing::debug!("Identity {} denied access to record {}", identity, id);
            return Err(ApiError::not_authorized(format!(
                "no access to record '{}'",
                id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserApi for AclLayer {
    async fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        if ctx.is_authenticated() {
            return Err(ApiError::not_authorized("already logged in"));
        }
        self.next.login(ctx, username, password).await
    }

    async fn add_users(
        &self,
        ctx: &RequestContext,
        input: Option<RecordStream>,
    ) -> Result<(), ApiError> {
        if self.require_admin_for_add_users && !ctx.is_admin() {
            return Err(ApiError::forbidden("adding users requires admin"));
        }
        self.next.add_users(ctx, input).await
    }

    async fn delete_user(&self, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
        Self::check_owner(ctx, id)?;
        self.next.delete_user(ctx, id).await
    }

    async fn get_user(&self, ctx: &RequestContext, id: &str) -> Result<Record, ApiError> {
        Self::check_owner(ctx, id)?;
        self.next.get_user(ctx, id).await
    }

    async fn get_user_list(
        &self,
        ctx: &RequestContext,
        query: ListQuery,
    ) -> Result<RecordList, ApiError> {
        if !ctx.is_authenticated() {
            return Err(ApiError::forbidden("authentication required"));
        }
        self.next.get_user_list(ctx, query).await
    }

    async fn update_user(
        &self,
        ctx: &RequestContext,
        id: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        Self::check_owner(ctx, id)?;
        self.next.update_user(ctx, id, content).await
    }
}
