//! Typed collections over the raw document store.
//!
//! A [`Document`] names the collection it lives in and its id; a
//! [`Collection`] converts between the typed struct and its JSON body on
//! every call.

use core::marker::PhantomData;

use opsdesk_types::{
    Activity, Customer, InventoryAlert, InventoryItem, Milestone, Project, PurchaseOrder,
    Shipment, Supplier, Task, User, UserRecord,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DbError;
use crate::query::{Filter, FindOptions, GroupCount};
use crate::store::DocumentStore;

/// A struct persisted as one document.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name.
    const COLLECTION: &'static str;

    /// The document's primary key.
    fn document_id(&self) -> Uuid;
}

macro_rules! impl_document {
    ($($ty:ty => $collection:literal),+ $(,)?) => {
        $(
            impl Document for $ty {
                const COLLECTION: &'static str = $collection;

                fn document_id(&self) -> Uuid {
                    self.id.into_inner()
                }
            }
        )+
    };
}

impl_document! {
    User => "users",
    Task => "tasks",
    Project => "projects",
    Milestone => "milestones",
    Customer => "customers",
    Supplier => "suppliers",
    InventoryItem => "inventory_items",
    InventoryAlert => "inventory_alerts",
    Shipment => "shipments",
    PurchaseOrder => "purchase_orders",
    Activity => "activities",
}

/// Users are stored with their password hash; [`User`] reads the same
/// documents without it.
impl Document for UserRecord {
    const COLLECTION: &'static str = User::COLLECTION;

    fn document_id(&self) -> Uuid {
        self.user.id.into_inner()
    }
}

/// Typed handle on one collection.
#[derive(Debug)]
pub struct Collection<'a, T> {
    store: &'a DocumentStore,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Document> Collection<'a, T> {
    pub(crate) const fn new(store: &'a DocumentStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Insert a new document.
    pub async fn insert(&self, document: &T) -> Result<(), DbError> {
        let body = serde_json::to_value(document)?;
        self.store
            .insert(T::COLLECTION, document.document_id(), body)
            .await
    }

    /// Fetch by id.
    pub async fn get(&self, id: impl Into<Uuid>) -> Result<Option<T>, DbError> {
        self.store
            .get(T::COLLECTION, id.into())
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(DbError::from)
    }

    /// Overwrite an existing document. Returns `false` if it is gone.
    pub async fn replace(&self, document: &T) -> Result<bool, DbError> {
        let body = serde_json::to_value(document)?;
        self.store
            .replace(T::COLLECTION, document.document_id(), body)
            .await
    }

    /// Delete by id. Returns `false` if it did not exist.
    pub async fn delete(&self, id: impl Into<Uuid>) -> Result<bool, DbError> {
        self.store.delete(T::COLLECTION, id.into()).await
    }

    /// Find matching documents.
    pub async fn find(&self, options: &FindOptions) -> Result<Vec<T>, DbError> {
        self.store
            .find(T::COLLECTION, options)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(DbError::from))
            .collect()
    }

    /// Every document matching `filter`, newest first.
    pub async fn find_all(&self, filter: Filter) -> Result<Vec<T>, DbError> {
        self.find(&FindOptions::new(filter)).await
    }

    /// The newest document matching `filter`.
    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, DbError> {
        let mut found = self.find(&FindOptions::new(filter).limit(1)).await?;
        Ok(found.pop())
    }

    /// Count matching documents.
    pub async fn count(&self, filter: &Filter) -> Result<u64, DbError> {
        self.store.count(T::COLLECTION, filter).await
    }

    /// Whether any document matches.
    pub async fn exists(&self, filter: &Filter) -> Result<bool, DbError> {
        Ok(self.count(filter).await? > 0)
    }

    /// Count matching documents grouped by `field`.
    pub async fn group_count(
        &self,
        filter: &Filter,
        field: &str,
    ) -> Result<Vec<GroupCount>, DbError> {
        self.store.group_count(T::COLLECTION, filter, field).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use opsdesk_types::{Role, UserId};

    use super::*;

    fn record(email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user: User {
                id: UserId::new(),
                name: String::from("Sam"),
                email: email.to_owned(),
                role: Role::Employee,
                department: None,
                is_active: true,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            password_hash: String::from("$argon2id$stub"),
        }
    }

    #[tokio::test]
    async fn user_and_record_share_a_collection() {
        let store = DocumentStore::memory();
        let rec = record("sam@example.com");
        store.collection::<UserRecord>().insert(&rec).await.unwrap();

        let public = store.collection::<User>().get(rec.user.id).await.unwrap();
        assert_eq!(public, Some(rec.user.clone()));

        let stored = store.collection::<UserRecord>().get(rec.user.id).await.unwrap();
        assert_eq!(stored.map(|r| r.password_hash), Some(rec.password_hash));
    }

    #[tokio::test]
    async fn find_one_and_exists_use_filters() {
        let store = DocumentStore::memory();
        let users = store.collection::<UserRecord>();
        users.insert(&record("a@example.com")).await.unwrap();
        users.insert(&record("b@example.com")).await.unwrap();

        let filter = Filter::new().eq("email", "b@example.com");
        assert!(users.exists(&filter).await.unwrap());
        let found = users.find_one(filter).await.unwrap();
        assert_eq!(found.map(|r| r.user.email), Some(String::from("b@example.com")));
        assert_eq!(users.count(&Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn replace_and_delete_round_trip() {
        let store = DocumentStore::memory();
        let users = store.collection::<UserRecord>();
        let mut rec = record("c@example.com");
        users.insert(&rec).await.unwrap();

        rec.user.name = String::from("Renamed");
        assert!(users.replace(&rec).await.unwrap());
        let got = users.get(rec.user.id).await.unwrap().unwrap();
        assert_eq!(got.user.name, "Renamed");

        assert!(users.delete(rec.user.id).await.unwrap());
        assert!(users.get(rec.user.id).await.unwrap().is_none());
    }
}
