//! Admin-curated project and staking listings, stored as whole JSON arrays
//! in the KV backend. Every mutation is read-modify-write over the full
//! array; concurrent writers are last-write-wins, which is acceptable for a
//! low-traffic admin surface.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::kv::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryKind {
    Project,
    Staking,
}

const MAX_DESCRIPTION_CHARS: usize = 120;

impl DirectoryKind {
    pub fn key(self) -> &'static str {
        match self {
            DirectoryKind::Project => "projects",
            DirectoryKind::Staking => "staking_projects",
        }
    }
}

/// Entries are opaque JSON objects; only `id` and `name` are mandated so the
/// admin UI can evolve its schema without a migration here.
fn validate_item(item: &Value) -> Result<String> {
    let object = item
        .as_object()
        .ok_or_else(|| Error::Validation("item must be a JSON object".to_string()))?;

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Validation("missing id".to_string()))?;
    object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Validation("missing name".to_string()))?;

    if let Some(description) = object.get("description").and_then(Value::as_str) {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(Error::Validation(format!(
                "description exceeds {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
    }

    Ok(id.to_string())
}

fn item_id(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

/// Idempotent insert: an existing id leaves the list untouched rather than
/// silently overwriting. Returns whether the list changed.
fn apply_create(list: &mut Vec<Value>, item: Value, id: &str) -> bool {
    if list.iter().any(|existing| item_id(existing) == Some(id)) {
        debug!("create skipped, id {} already present", id);
        return false;
    }
    list.insert(0, item);
    true
}

/// Upsert: shallow-merge over the matching entry, or prepend when absent.
fn apply_upsert(list: &mut Vec<Value>, item: Value, id: &str) {
    for existing in list.iter_mut() {
        if item_id(existing) == Some(id) {
            match (existing.as_object_mut(), item.as_object()) {
                (Some(old), Some(new)) => {
                    for (key, value) in new {
                        old.insert(key.clone(), value.clone());
                    }
                }
                _ => *existing = item,
            }
            return;
        }
    }
    list.insert(0, item);
}

/// Removes the matching entry; an absent id is a no-op, not an error.
fn apply_delete(list: &mut Vec<Value>, id: &str) {
    list.retain(|existing| item_id(existing) != Some(id));
}

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    store: Option<Arc<KvStore>>,
}

impl DirectoryStore {
    pub fn new(store: Option<Arc<KvStore>>) -> Self {
        Self { store }
    }

    fn backend(&self) -> Result<&KvStore> {
        self.store.as_deref().ok_or(Error::StorageNotConfigured)
    }

    async fn read_list(&self, kind: DirectoryKind) -> Result<Vec<Value>> {
        let raw = match self.backend()?.get(kind.key()).await? {
            Some(raw) => raw,
            None => return Ok(Vec::new()),
        };

        // Anything that is not a JSON array is treated as an empty list, so
        // a corrupt key never bricks the admin surface.
        let list = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|value| match value {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default();
        Ok(list)
    }

    async fn write_list(&self, kind: DirectoryKind, list: &[Value]) -> Result<()> {
        let serialized = serde_json::to_string(list)?;
        self.backend()?.set(kind.key(), &serialized).await
    }

    pub async fn list(&self, kind: DirectoryKind) -> Result<Vec<Value>> {
        self.read_list(kind).await
    }

    pub async fn create(&self, kind: DirectoryKind, item: Value) -> Result<Vec<Value>> {
        let id = validate_item(&item)?;
        let mut list = self.read_list(kind).await?;
        if apply_create(&mut list, item, &id) {
            self.write_list(kind, &list).await?;
        }
        Ok(list)
    }

    pub async fn update(&self, kind: DirectoryKind, item: Value) -> Result<Vec<Value>> {
        let id = validate_item(&item)?;
        let mut list = self.read_list(kind).await?;
        apply_upsert(&mut list, item, &id);
        self.write_list(kind, &list).await?;
        Ok(list)
    }

    pub async fn delete(&self, kind: DirectoryKind, id: &str) -> Result<Vec<Value>> {
        if id.is_empty() {
            return Err(Error::Validation("missing id".to_string()));
        }
        let mut list = self.read_list(kind).await?;
        apply_delete(&mut list, id);
        self.write_list(kind, &list).await?;
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_requires_id_and_name() {
        assert!(validate_item(&json!({"id": "a", "name": "Alpha"})).is_ok());
        assert!(matches!(
            validate_item(&json!({"name": "Alpha"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_item(&json!({"id": "a"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_item(&json!({"id": "", "name": "Alpha"})),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_item(&json!("not an object")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn validation_caps_description_length() {
        let long = "x".repeat(121);
        assert!(matches!(
            validate_item(&json!({"id": "a", "name": "Alpha", "description": long})),
            Err(Error::Validation(_))
        ));
        let ok = "x".repeat(120);
        assert!(validate_item(&json!({"id": "a", "name": "Alpha", "description": ok})).is_ok());
    }

    #[test]
    fn create_prepends_and_is_idempotent() {
        let mut list = vec![json!({"id": "a", "name": "Alpha"})];

        assert!(apply_create(&mut list, json!({"id": "b", "name": "Beta"}), "b"));
        assert_eq!(list.len(), 2);
        assert_eq!(item_id(&list[0]), Some("b"));

        // Re-creating an existing id leaves the stored entry untouched.
        assert!(!apply_create(
            &mut list,
            json!({"id": "a", "name": "Renamed"}),
            "a"
        ));
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["name"], "Alpha");
    }

    #[test]
    fn upsert_shallow_merges_existing_entries() {
        let mut list = vec![json!({"id": "a", "name": "Alpha", "tvlUSD": 100})];

        apply_upsert(&mut list, json!({"id": "a", "netAPY": 4.2}), "a");
        assert_eq!(list.len(), 1);
        // Merged fields land next to the untouched ones.
        assert_eq!(list[0]["name"], "Alpha");
        assert_eq!(list[0]["tvlUSD"], 100);
        assert_eq!(list[0]["netAPY"], 4.2);
    }

    #[test]
    fn upsert_prepends_unknown_ids() {
        let mut list = vec![json!({"id": "a", "name": "Alpha"})];
        apply_upsert(&mut list, json!({"id": "b", "name": "Beta"}), "b");
        assert_eq!(list.len(), 2);
        assert_eq!(item_id(&list[0]), Some("b"));
    }

    #[test]
    fn delete_filters_by_id_and_tolerates_misses() {
        let mut list = vec![
            json!({"id": "a", "name": "Alpha"}),
            json!({"id": "b", "name": "Beta"}),
        ];

        apply_delete(&mut list, "a");
        assert_eq!(list.len(), 1);
        assert_eq!(item_id(&list[0]), Some("b"));

        apply_delete(&mut list, "missing");
        assert_eq!(list.len(), 1);
    }

    #[tokio::test]
    async fn unconfigured_backend_is_a_distinct_error() {
        let store = DirectoryStore::new(None);
        assert!(matches!(
            store.list(DirectoryKind::Project).await,
            Err(Error::StorageNotConfigured)
        ));
        assert!(matches!(
            store
                .create(DirectoryKind::Staking, json!({"id": "a", "name": "Alpha"}))
                .await,
            Err(Error::StorageNotConfigured)
        ));
        // Validation still runs first, even without a backend.
        assert!(matches!(
            store.create(DirectoryKind::Project, json!({})).await,
            Err(Error::Validation(_))
        ));
    }
}
