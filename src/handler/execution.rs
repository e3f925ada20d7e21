use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{RecordStream, UserApi};
use crate::auth::secrets_match;
use crate::context::{RequestContext, ADMIN_IDENTITY};
use crate::data::parser::RecordParser;
use crate::data::record::{ListQuery, ProcessingOutcome, Record, RecordList, FIELD_ID};
use crate::env::Services;
use crate::error::ApiError;
use crate::processing::steps::{PassThrough, SaveToStore};
use crate::processing::traits::{RecordCallback, RecordSource};
use crate::processing::TransformChain;
use crate::storage::{RecordStore, StoreError};

/// Innermost layer: talks to the store, the blob store and the runner.
/// Callers are expected to have passed validation and access control.
pub struct ExecutionLayer {
    services: Arc<Services>,
    ingest: Arc<TransformChain>,
    retrieve: Arc<TransformChain>,
}

impl ExecutionLayer {
    pub fn new(services: Arc<Services>) -> Self {
        let ingest = TransformChain::ingest(services.blobs.clone(), services.hasher.clone());
        let retrieve = TransformChain::retrieve(services.blobs.clone());
        Self {
            services,
            ingest: Arc::new(ingest),
            retrieve: Arc::new(retrieve),
        }
    }

    async fn verify_user(&self, username: &str, password: &str) -> Result<bool, ApiError> {
        let record = match self.services.store.get(username).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let Some(hashed) = record.password() else {
            return Ok(false);
        };

        let hasher = self.services.hasher.clone();
        let candidate = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&hashed, &candidate))
            .await
            .map_err(|e| ApiError::internal(format!("verify task failed: {}", e)))
    }
}

/// Fan-out source reading one page of the record store
struct StorePage {
    store: Arc<dyn RecordStore>,
    owner: Option<String>,
    offset: usize,
    limit: usize,
}

#[async_trait]
impl RecordSource for StorePage {
    fn name(&self) -> &'static str {
        "StorePage"
    }

    async fn provide(self: Box<Self>, on_record: &mut RecordCallback<'_>) -> Result<(), ApiError> {
        match &self.owner {
            Some(owner) => {
                self.store
                    .list_for_owner(owner, self.offset, self.limit, on_record)
                    .await
            }
            None => self.store.list(self.offset, self.limit, on_record).await,
        }
    }
}

fn log_outcome(operation: &str, outcome: &ProcessingOutcome) {
    match &outcome.error {
        None => info!(record_id = %outcome.record_id, "{}: record processed", operation),
        Some(err) => warn!(
            record_id = %outcome.record_id,
            kind = ?err.kind(),
            "{}: record failed: {}",
            operation,
            err
        ),
    }
}

fn to_usize(value: i64, name: &str) -> Result<usize, ApiError> {
    usize::try_from(value).map_err(|_| ApiError::bad_input(format!("invalid {}", name)))
}

#[async_trait]
impl UserApi for ExecutionLayer {
    async fn login(
        &self,
        _ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let matches = if username == ADMIN_IDENTITY {
            secrets_match(&self.services.admin_password, password)
        } else {
            self.verify_user(username, password).await?
        };

        if !matches {
            debug!("Login failed for {}", username);
            return Err(ApiError::not_authorized("invalid login or password"));
        }
        info!("User {} logged in", username);
        Ok(())
    }

    async fn add_users(
        &self,
        _ctx: &RequestContext,
        input: Option<RecordStream>,
    ) -> Result<(), ApiError> {
        let Some(input) = input else {
            return Err(ApiError::bad_input("record stream is required"));
        };

        let started = Instant::now();
        let run = self.services.runner.run(
            Box::new(RecordParser::new(input)),
            self.ingest.clone(),
            Arc::new(SaveToStore::new(self.services.store.clone())),
        );

        let (mut added, mut failed) = (0usize, 0usize);
        let result = run
            .for_each(|outcome| {
                log_outcome("add_users", &outcome);
                if outcome.is_success() {
                    added += 1;
                } else {
                    failed += 1;
                }
            })
            .await;

        info!(
            "add_users: {} added, {} failed in {:?}",
            added,
            failed,
            started.elapsed()
        );
        result.into_result()
    }

    async fn delete_user(&self, _ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
        self.services.blobs.delete(id).await?;
        self.services.store.delete(id).await?;
        info!("User {} deleted", id);
        Ok(())
    }

    async fn get_user(&self, _ctx: &RequestContext, id: &str) -> Result<Record, ApiError> {
        let record = self.services.store.get(id).await?;
        self.retrieve.apply(record).await
    }

    async fn get_user_list(
        &self,
        ctx: &RequestContext,
        query: ListQuery,
    ) -> Result<RecordList, ApiError> {
        let owner = if ctx.is_admin() {
            None
        } else {
            let identity = ctx
                .identity()
                .ok_or_else(|| ApiError::forbidden("authentication required"))?;
            Some(identity.to_string())
        };

        let source = StorePage {
            store: self.services.store.clone(),
            owner,
            offset: to_usize(query.offset, "offset")?,
            limit: to_usize(query.count, "count")?,
        };
        let run = self
            .services
            .runner
            .run(Box::new(source), self.retrieve.clone(), Arc::new(PassThrough));

        let mut records = Vec::new();
        let result = run
            .for_each(|outcome| {
                if outcome.is_success() {
                    records.push(outcome.transformed);
                } else {
                    log_outcome("get_user_list", &outcome);
                }
            })
            .await;
        result.into_result()?;

        records.sort_by_cached_key(Record::id);
        Ok(RecordList {
            offset: query.offset,
            records,
        })
    }

    async fn update_user(
        &self,
        _ctx: &RequestContext,
        id: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        let record = Record::parse(content)?;
        let record = match record.field_string(FIELD_ID) {
            None => record.with_field(FIELD_ID, id)?,
            Some(record_id) if record_id == id => record,
            Some(record_id) => {
                return Err(ApiError::bad_input(format!(
                    "record id '{}' does not match '{}'",
                    record_id, id
                )))
            }
        };

        let record = self.ingest.apply(record).await?;
        self.services.store.save(&record).await?;
        info!("User {} updated", id);
        Ok(())
    }
}
