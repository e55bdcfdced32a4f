//! In-process document store.
//!
//! Holds every collection in a [`BTreeMap`] behind a tokio [`RwLock`] and
//! evaluates the [`crate::query`] model directly against the JSON bodies.
//! Used for local development and for API tests, where it behaves like the
//! `PostgreSQL` backend for every query the handlers issue.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DbError;
use crate::query::{
    lookup, text_of, Condition, Direction, Filter, FindOptions, GroupCount, Scalar, ScalarKind,
};

type Collections = BTreeMap<String, BTreeMap<Uuid, Value>>;

/// Shared, cloneable in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] if the id is already present.
    pub async fn insert(&self, collection: &str, id: Uuid, body: Value) -> Result<(), DbError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_owned()).or_default();
        if documents.contains_key(&id) {
            return Err(DbError::Duplicate {
                collection: collection.to_owned(),
                id,
            });
        }
        documents.insert(id, body);
        Ok(())
    }

    /// Fetch one document by id.
    pub async fn get(&self, collection: &str, id: Uuid) -> Option<Value> {
        let collections = self.collections.read().await;
        collections.get(collection).and_then(|docs| docs.get(&id)).cloned()
    }

    /// Replace an existing document. Returns `false` if it does not exist.
    pub async fn replace(&self, collection: &str, id: Uuid, body: Value) -> bool {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection).and_then(|docs| docs.get_mut(&id)) {
            Some(slot) => {
                *slot = body;
                true
            }
            None => false,
        }
    }

    /// Delete a document. Returns `false` if it did not exist.
    pub async fn delete(&self, collection: &str, id: Uuid) -> bool {
        let mut collections = self.collections.write().await;
        collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id))
            .is_some()
    }

    /// Run a find against one collection.
    pub async fn find(&self, collection: &str, options: &FindOptions) -> Vec<Value> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Vec::new();
        };

        let mut matches: Vec<(&Uuid, &Value)> = documents
            .iter()
            .filter(|(_, doc)| matches_filter(doc, &options.filter))
            .collect();

        let sort = &options.sort;
        matches.sort_by(|(a_id, a), (b_id, b)| {
            let a_key = sort_key(a, &sort.field, sort.kind);
            let b_key = sort_key(b, &sort.field, sort.kind);
            let primary = match (a_key, b_key) {
                (Some(a), Some(b)) => directed(a.cmp(&b), sort.direction),
                // Missing values sort last regardless of direction.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            primary.then_with(|| directed(a_id.cmp(b_id), sort.direction))
        });

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    /// Count documents matching `filter`.
    pub async fn count(&self, collection: &str, filter: &Filter) -> u64 {
        let collections = self.collections.read().await;
        let count = collections.get(collection).map_or(0, |docs| {
            docs.values().filter(|doc| matches_filter(doc, filter)).count()
        });
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Count documents matching `filter`, grouped by the value of `field`.
    ///
    /// Buckets are ordered by count (descending), then key.
    pub async fn group_count(
        &self,
        collection: &str,
        filter: &Filter,
        field: &str,
    ) -> Vec<GroupCount> {
        let collections = self.collections.read().await;
        let mut buckets: BTreeMap<Option<String>, u64> = BTreeMap::new();
        if let Some(documents) = collections.get(collection) {
            for doc in documents.values().filter(|doc| matches_filter(doc, filter)) {
                let key = lookup(doc, field).and_then(text_of);
                let slot = buckets.entry(key).or_insert(0);
                *slot = slot.saturating_add(1);
            }
        }

        let mut groups: Vec<GroupCount> = buckets
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        groups
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Whether a document satisfies every condition of the filter.
pub fn matches_filter(document: &Value, filter: &Filter) -> bool {
    filter
        .conditions()
        .iter()
        .all(|condition| matches_condition(document, condition))
}

fn matches_condition(document: &Value, condition: &Condition) -> bool {
    match condition {
        Condition::Eq { field, value } => {
            let found = lookup(document, field).unwrap_or(&Value::Null);
            found == value
        }
        Condition::EqIgnoreCase { field, value } => lookup(document, field)
            .and_then(Value::as_str)
            .is_some_and(|found| found.to_lowercase() == value.to_lowercase()),
        Condition::Ne { field, value } => lookup(document, field) != Some(value),
        Condition::In { field, values } => {
            let found = lookup(document, field).unwrap_or(&Value::Null);
            values.contains(found)
        }
        Condition::NotIn { field, values } => {
            let found = lookup(document, field).unwrap_or(&Value::Null);
            !values.contains(found)
        }
        Condition::Contains { field, value } => {
            lookup(document, field).is_some_and(|found| json_contains(found, value))
        }
        Condition::Search { fields, needle } => {
            let needle = needle.to_lowercase();
            fields.iter().any(|field| {
                lookup(document, field)
                    .and_then(text_of)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
        Condition::Compare { field, op, value } => {
            let Some(found) = sort_key(document, field, value.kind()) else {
                return false;
            };
            found
                .partial_cmp(&ScalarKey::from(value))
                .is_some_and(|ordering| op.accepts(ordering))
        }
        Condition::FieldCompare {
            left,
            op,
            right,
            kind,
        } => match (sort_key(document, left, *kind), sort_key(document, right, *kind)) {
            (Some(l), Some(r)) => l.partial_cmp(&r).is_some_and(|ordering| op.accepts(ordering)),
            _ => false,
        },
        Condition::IsNull { field } => lookup(document, field).is_none_or(Value::is_null),
    }
}

/// JSON containment with the semantics of `PostgreSQL`'s `jsonb @> jsonb`.
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(key, nv)| h.get(key).is_some_and(|hv| json_contains(hv, nv))),
        (Value::Array(h), Value::Array(n)) => n
            .iter()
            .all(|nv| h.iter().any(|hv| json_contains(hv, nv))),
        // A top-level array contains a bare primitive it holds.
        (Value::Array(h), primitive) if !primitive.is_object() => h.contains(primitive),
        (h, n) => h == n,
    }
}

/// Comparable projection of a field under a [`ScalarKind`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ScalarKey {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
}

impl From<&Scalar> for ScalarKey {
    fn from(value: &Scalar) -> Self {
        match value {
            Scalar::Integer(i) => Self::Integer(*i),
            Scalar::Decimal(d) => Self::Decimal(*d),
            Scalar::Timestamp(t) => Self::Timestamp(*t),
        }
    }
}

fn sort_key(document: &Value, field: &str, kind: ScalarKind) -> Option<ScalarKey> {
    let value = lookup(document, field)?;
    match kind {
        ScalarKind::Text => text_of(value).map(ScalarKey::Text),
        ScalarKind::Integer => value.as_i64().map(ScalarKey::Integer),
        ScalarKind::Decimal => match value {
            Value::String(s) => s.parse::<Decimal>().ok().map(ScalarKey::Decimal),
            Value::Number(n) => n.to_string().parse::<Decimal>().ok().map(ScalarKey::Decimal),
            _ => None,
        },
        ScalarKind::Timestamp => value
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| ScalarKey::Timestamp(t.with_timezone(&Utc))),
    }
}

const fn directed(ordering: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::query::{CompareOp, Sort};

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let docs = [
            json!({"name": "Bolt", "sku": "B-1", "category": "hardware", "stockQuantity": 4,
                   "reorderPoint": 10, "unitCost": "0.25", "createdAt": "2026-01-01T10:00:00Z",
                   "tags": ["metal", "small"], "address": {"city": "Lyon"}}),
            json!({"name": "Nut", "sku": "N-1", "category": "hardware", "stockQuantity": 40,
                   "reorderPoint": 10, "unitCost": "0.10", "createdAt": "2026-01-02T10:00:00.5Z",
                   "tags": ["metal"], "address": {"city": "Paris"}}),
            json!({"name": "Glue", "sku": "G-1", "category": "chemicals", "stockQuantity": 0,
                   "reorderPoint": 2, "unitCost": "4.00", "createdAt": "2026-01-03T10:00:00Z",
                   "tags": [], "address": null}),
        ];
        for doc in docs {
            store.insert("items", Uuid::now_v7(), doc).await.unwrap();
        }
        store
    }

    fn names(docs: &[Value]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        store.insert("c", id, json!({})).await.unwrap();
        let err = store.insert("c", id, json!({})).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn replace_and_delete_report_presence() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        assert!(!store.replace("c", id, json!({"a": 1})).await);
        store.insert("c", id, json!({"a": 1})).await.unwrap();
        assert!(store.replace("c", id, json!({"a": 2})).await);
        assert_eq!(store.get("c", id).await, Some(json!({"a": 2})));
        assert!(store.delete("c", id).await);
        assert!(!store.delete("c", id).await);
    }

    #[tokio::test]
    async fn default_sort_is_newest_first_with_mixed_precision() {
        let store = seeded().await;
        let docs = store.find("items", &FindOptions::default()).await;
        assert_eq!(names(&docs), vec!["Glue", "Nut", "Bolt"]);
    }

    #[tokio::test]
    async fn eq_search_and_pagination() {
        let store = seeded().await;
        let filter = Filter::new().eq("category", "hardware");
        assert_eq!(store.count("items", &filter).await, 2);

        let search = Filter::new().search(&["name", "sku"], Some("n-1"));
        let docs = store.find("items", &FindOptions::new(search)).await;
        assert_eq!(names(&docs), vec!["Nut"]);

        let page = FindOptions::default()
            .sort(Sort::asc("name", ScalarKind::Text))
            .skip(1)
            .limit(1);
        assert_eq!(names(&store.find("items", &page).await), vec!["Glue"]);
    }

    #[tokio::test]
    async fn field_compare_finds_low_stock() {
        let store = seeded().await;
        let low = Filter::new().field_compare(
            "stockQuantity",
            CompareOp::Lte,
            "reorderPoint",
            ScalarKind::Integer,
        );
        let docs = store
            .find("items", &FindOptions::new(low).sort(Sort::asc("name", ScalarKind::Text)))
            .await;
        assert_eq!(names(&docs), vec!["Bolt", "Glue"]);
    }

    #[tokio::test]
    async fn typed_compare_and_sort() {
        let store = seeded().await;
        let cheap = Filter::new().compare(
            "unitCost",
            CompareOp::Lt,
            Scalar::Decimal(Decimal::new(1, 0)),
        );
        assert_eq!(store.count("items", &cheap).await, 2);

        let by_cost = FindOptions::default().sort(Sort::desc("unitCost", ScalarKind::Decimal));
        assert_eq!(names(&store.find("items", &by_cost).await), vec!["Glue", "Bolt", "Nut"]);

        let after = Filter::new().compare(
            "createdAt",
            CompareOp::Gte,
            Scalar::Timestamp("2026-01-02T00:00:00Z".parse().unwrap()),
        );
        assert_eq!(store.count("items", &after).await, 2);
    }

    #[tokio::test]
    async fn containment_in_and_null_checks() {
        let store = seeded().await;
        let metal = Filter::new().array_contains("tags", "metal");
        assert_eq!(store.count("items", &metal).await, 2);

        let lyon = Filter::new().eq("address.city", "Lyon");
        assert_eq!(store.count("items", &lyon).await, 1);

        let either = Filter::new().is_in("sku", ["B-1", "G-1"]);
        assert_eq!(store.count("items", &either).await, 2);
        let neither = Filter::new().not_in("sku", ["B-1", "G-1"]);
        assert_eq!(store.count("items", &neither).await, 1);

        let no_address = Filter::new().is_null("address");
        assert_eq!(store.count("items", &no_address).await, 1);
        let glue = Filter::new().eq_ignore_case("name", "gLUE");
        assert_eq!(store.count("items", &glue).await, 1);
        let not_glue = Filter::new().ne("name", "Glue");
        assert_eq!(store.count("items", &not_glue).await, 2);
    }

    #[tokio::test]
    async fn group_count_orders_by_count() {
        let store = seeded().await;
        let groups = store.group_count("items", &Filter::new(), "category").await;
        assert_eq!(
            groups,
            vec![
                GroupCount { key: Some(String::from("hardware")), count: 2 },
                GroupCount { key: Some(String::from("chemicals")), count: 1 },
            ]
        );
    }

    #[test]
    fn json_contains_matches_postgres_semantics() {
        let lines = json!([{"item": "a", "quantity": 2}, {"item": "b", "quantity": 1}]);
        assert!(json_contains(&lines, &json!([{"item": "b"}])));
        assert!(!json_contains(&lines, &json!([{"item": "c"}])));
        assert!(json_contains(&json!(["x", "y"]), &json!("x")));
        assert!(json_contains(&json!({"a": {"b": 1}, "c": 2}), &json!({"a": {"b": 1}})));
    }
}
