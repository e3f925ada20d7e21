use async_trait::async_trait;

use crate::data::record::Record;
use crate::error::ApiError;

/// Callback receiving records one at a time from a source. Returning an
/// error stops the source.
pub type RecordCallback<'a> = dyn FnMut(Record) -> Result<(), ApiError> + Send + 'a;

/// One record rewrite. Steps never mutate their input: they return a new
/// record or fail, and perform at most one external effect each.
#[async_trait]
pub trait RecordStep: Send + Sync {
    /// Step name for logging and debugging
    fn name(&self) -> &'static str;

    async fn apply(&self, record: Record) -> Result<Record, ApiError>;
}

/// Produces records for a fan-out run. Consumed by the run that drives it.
#[async_trait]
pub trait RecordSource: Send {
    fn name(&self) -> &'static str;

    /// Push every record to `on_record`, in source order, then return the
    /// source's terminal status.
    async fn provide(self: Box<Self>, on_record: &mut RecordCallback<'_>) -> Result<(), ApiError>;
}
