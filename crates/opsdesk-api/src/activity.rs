//! Activity log writes.
//!
//! Mutating handlers record an [`Activity`] after the change is stored.
//! A failed log write fails the request with a `500` like any other
//! storage error.

use chrono::Utc;
use opsdesk_db::DocumentStore;
use opsdesk_types::{Activity, ActivityAction, ActivityId, EntityType, UserId};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// An activity about to be recorded.
#[derive(Debug, Clone)]
pub struct Entry {
    user: UserId,
    action: ActivityAction,
    entity_type: EntityType,
    entity_id: Uuid,
    description: String,
    metadata: Value,
}

impl Entry {
    /// Describe `action` by `user` on one document.
    pub fn new(
        user: UserId,
        action: ActivityAction,
        entity_type: EntityType,
        entity_id: impl Into<Uuid>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user,
            action,
            entity_type,
            entity_id: entity_id.into(),
            description: description.into(),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Store the activity.
///
/// # Errors
///
/// Returns [`ApiError::Database`] if the insert fails.
pub async fn record(store: &DocumentStore, entry: Entry) -> Result<(), ApiError> {
    let activity = Activity {
        id: ActivityId::new(),
        user: entry.user,
        action: entry.action,
        entity_type: entry.entity_type,
        entity_id: entry.entity_id,
        description: entry.description,
        metadata: entry.metadata,
        created_at: Utc::now(),
    };

    store
        .collection::<Activity>()
        .insert(&activity)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                action = %activity.action,
                entity_type = %activity.entity_type,
                entity_id = %activity.entity_id,
                "Failed to record activity"
            );
            ApiError::Database(e)
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use opsdesk_db::{Filter, PostgresConfig, PostgresStore};

    use super::*;

    fn entry() -> Entry {
        Entry::new(
            UserId::new(),
            ActivityAction::Create,
            EntityType::Customer,
            Uuid::new_v4(),
            "Created customer Acme",
        )
    }

    #[tokio::test]
    async fn record_stores_the_activity() {
        let store = DocumentStore::memory();
        record(&store, entry()).await.unwrap();

        let count = store
            .collection::<Activity>()
            .count(&Filter::new().eq("entityType", EntityType::Customer))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unreachable_store_is_an_error() {
        let config = PostgresConfig::new("postgres://opsdesk@127.0.0.1:1/opsdesk")
            .with_connect_timeout(Duration::from_millis(200));
        let store = DocumentStore::Postgres(PostgresStore::connect_lazy(&config).unwrap());

        let result = record(&store, entry()).await;

        assert!(matches!(result, Err(ApiError::Database(_))));
    }
}
