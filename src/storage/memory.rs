use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{RecordStore, StoreError};
use crate::data::record::Record;
use crate::error::ApiError;
use crate::processing::traits::RecordCallback;

/// Process-local record store, ordered by id.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, record: &Record) -> Result<(), StoreError> {
        let id = record.id();
        if id.is_empty() {
            return Err(StoreError::InvalidDocument("record has no id".into()));
        }
        self.records.write().await.insert(id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.records.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn get(&self, id: &str) -> Result<Record, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(
        &self,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), ApiError> {
        let records = self.records.read().await;
        for record in records.values().skip(offset).take(limit) {
            on_record(record.clone())?;
        }
        Ok(())
    }

    async fn list_for_owner(
        &self,
        owner: &str,
        offset: usize,
        limit: usize,
        on_record: &mut RecordCallback<'_>,
    ) -> Result<(), ApiError> {
        let records = self.records.read().await;
        let owned = records
            .iter()
            .filter(|(id, _)| id.as_str() == owner)
            .map(|(_, record)| record);
        for record in owned.skip(offset).take(limit) {
            on_record(record.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        for id in ["c", "a", "b"] {
            store
                .save(&Record::new(format!(r#"{{"id":"{}"}}"#, id)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let store = seeded().await;
        assert_eq!(store.get("a").await.unwrap().id(), "a");

        store.delete("a").await.unwrap();
        assert!(matches!(store.get("a").await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete("a").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let store = seeded().await;
        store
            .save(&Record::new(r#"{"id":"a","name":"second"}"#))
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);
        assert_eq!(
            store.get("a").await.unwrap().field_string("name").as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn test_list_applies_offset_and_limit_in_id_order() {
        let store = seeded().await;
        let mut ids = Vec::new();
        store
            .list(1, 5, &mut |record| {
                ids.push(record.id());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_list_for_owner() {
        let store = seeded().await;
        let mut ids = Vec::new();
        store
            .list_for_owner("b", 0, 10, &mut |record| {
                ids.push(record.id());
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_list_stops_on_callback_error() {
        let store = seeded().await;
        let mut calls = 0;
        let result = store
            .list(0, 10, &mut |_| {
                calls += 1;
                Err(ApiError::internal("stop"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
