//! The persistent world model: location and object tables, actor location
//! pointers, sitting flags and the admin set.
//!
//! Tables are created lazily. The first read of a table seeds it from the
//! compiled-in defaults; every read reconciles it (see
//! [`crate::world::reconcile`]) and writes the merged table back.
//!
//! Every read-modify-write of a table runs under that table's mutex, so
//! overlapping events can no longer interleave a reconciliation with a
//! mutation of the same table. Pointer and flag keys are single-key writes
//! and take no lock.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, MutexGuard};

use crate::store::{self, KvStore, StoreError, KEY_ADMIN, KEY_LOCATIONS, KEY_OBJECTS};
use crate::world::errors::WorldError;
use crate::world::objects::ObjectRegistry;
use crate::world::reconcile::{position_of, reconcile, record_id, table_from_value};
use crate::world::types::{
    default_location, default_locations, default_objects, Location, DEFAULT_LOCATION_ID,
};

/// The two reconciled tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Locations,
    Objects,
}

impl TableKind {
    pub fn key(self) -> &'static str {
        match self {
            TableKind::Locations => KEY_LOCATIONS,
            TableKind::Objects => KEY_OBJECTS,
        }
    }

    pub fn defaults(self) -> Vec<Value> {
        match self {
            TableKind::Locations => default_locations(),
            TableKind::Objects => default_objects(),
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            TableKind::Locations => "location",
            TableKind::Objects => "object",
        }
    }

    /// Table stored under `key`, if any.
    pub fn for_key(key: &str) -> Option<Self> {
        match key {
            KEY_LOCATIONS => Some(TableKind::Locations),
            KEY_OBJECTS => Some(TableKind::Objects),
            _ => None,
        }
    }
}

pub struct WorldModel {
    store: Arc<dyn KvStore>,
    default_location: String,
    locations_lock: Mutex<()>,
    objects_lock: Mutex<()>,
    admin_lock: Mutex<()>,
}

impl WorldModel {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_default_location(store, DEFAULT_LOCATION_ID)
    }

    pub fn with_default_location(store: Arc<dyn KvStore>, default_location: &str) -> Self {
        Self {
            store,
            default_location: default_location.to_string(),
            locations_lock: Mutex::new(()),
            objects_lock: Mutex::new(()),
            admin_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn default_location_id(&self) -> &str {
        &self.default_location
    }

    pub fn objects(&self) -> ObjectRegistry<'_> {
        ObjectRegistry::new(self)
    }

    async fn lock(&self, kind: TableKind) -> MutexGuard<'_, ()> {
        match kind {
            TableKind::Locations => self.locations_lock.lock().await,
            TableKind::Objects => self.objects_lock.lock().await,
        }
    }

    /// Load and reconcile `kind`, persisting the merge when it changed
    /// anything. Caller must hold the table lock.
    async fn load_reconciled(&self, kind: TableKind) -> Result<Vec<Value>, WorldError> {
        let (mut table, fresh) = match self.store.get(kind.key()).await {
            Ok(value) => match table_from_value(value) {
                Some(table) => (table, false),
                None => {
                    warn!("Stored {} table is not a list; leaving it untouched", kind.entity());
                    return Err(WorldError::NotATable { entity: kind.entity() });
                }
            },
            Err(StoreError::NotFound(_)) => (Vec::new(), true),
            Err(e) => return Err(e.into()),
        };
        let report = reconcile(&mut table, &kind.defaults());
        if fresh || report.changed() {
            if fresh {
                info!("Seeded {} table with {} default(s)", kind.entity(), report.inserted);
            } else {
                debug!(
                    "Reconciled {} table: inserted={} backfilled_fields={}",
                    kind.entity(),
                    report.inserted,
                    report.backfilled_fields
                );
            }
            self.store.put(kind.key(), Value::Array(table.clone())).await?;
        }
        Ok(table)
    }

    /// The reconciled table for `kind`.
    pub async fn get_table(&self, kind: TableKind) -> Result<Vec<Value>, WorldError> {
        let _guard = self.lock(kind).await;
        self.load_reconciled(kind).await
    }

    /// Run `f` over the reconciled table and persist the result, all under
    /// the table's lock. Nothing is written when `f` fails.
    pub async fn update_table<T, F>(&self, kind: TableKind, f: F) -> Result<T, WorldError>
    where
        F: FnOnce(&mut Vec<Value>) -> Result<T, WorldError>,
    {
        let _guard = self.lock(kind).await;
        let mut table = self.load_reconciled(kind).await?;
        let out = f(&mut table)?;
        self.store.put(kind.key(), Value::Array(table)).await?;
        Ok(out)
    }

    /// Typed view of a table. Entries that do not parse are skipped.
    pub async fn records<T: DeserializeOwned>(&self, kind: TableKind) -> Result<Vec<T>, WorldError> {
        let table = self.get_table(kind).await?;
        Ok(table
            .into_iter()
            .filter_map(|raw| {
                let id = record_id(&raw).unwrap_or("?").to_string();
                serde_json::from_value(raw)
                    .map_err(|e| warn!("Skipping malformed {} '{}': {}", kind.entity(), id, e))
                    .ok()
            })
            .collect())
    }

    /// Replace the record with id `id` by `f(record)` under the table lock.
    pub async fn update_record<T, F>(&self, kind: TableKind, id: &str, f: F) -> Result<T, WorldError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        self.update_table(kind, |table| {
            let pos = position_of(table, id).ok_or_else(|| WorldError::NotFound {
                entity: kind.entity(),
                id: id.to_string(),
            })?;
            let mut record: T = serde_json::from_value(table[pos].clone())
                .map_err(|source| WorldError::Malformed { entity: kind.entity(), source })?;
            f(&mut record);
            table[pos] = serde_json::to_value(&record)
                .map_err(|source| WorldError::Malformed { entity: kind.entity(), source })?;
            Ok(record)
        })
        .await
    }

    pub async fn locations(&self) -> Result<Vec<Location>, WorldError> {
        self.records(TableKind::Locations).await
    }

    pub async fn location(&self, id: &str) -> Result<Option<Location>, WorldError> {
        Ok(self.locations().await?.into_iter().find(|l| l.id == id))
    }

    /// Stored location id for `actor_id`, or the default location.
    pub async fn location_id(&self, actor_id: &str) -> Result<String, WorldError> {
        let key = store::location_key(actor_id);
        let value = store::get_or(self.store.as_ref(), &key, json!(self.default_location)).await?;
        Ok(match value {
            Value::String(id) => id,
            other => {
                warn!("Location pointer for {} is not a string: {}", actor_id, other);
                self.default_location.clone()
            }
        })
    }

    /// Where `actor_id` currently is. A pointer to a location that no
    /// longer exists yields [`Location::void`].
    pub async fn get_location(&self, actor_id: &str) -> Result<Location, WorldError> {
        let id = self.location_id(actor_id).await?;
        match self.location(&id).await? {
            Some(loc) => Ok(loc),
            None => {
                debug!("Location '{}' of {} no longer exists", id, actor_id);
                Ok(Location::void())
            }
        }
    }

    /// Point `actor_id` at `location_id`. Existence is not checked.
    pub async fn set_location(&self, actor_id: &str, location_id: &str) -> Result<(), WorldError> {
        self.store
            .put(&store::location_key(actor_id), json!(location_id))
            .await?;
        Ok(())
    }

    /// Replace a location with its compiled-in default.
    pub async fn reset_location(&self, id: &str) -> Result<(), WorldError> {
        let pristine = default_location(id);
        self.update_table(TableKind::Locations, |table| {
            let pos = position_of(table, id).ok_or_else(|| WorldError::NotFound {
                entity: "location",
                id: id.to_string(),
            })?;
            table[pos] = pristine.ok_or_else(|| WorldError::NoDefault(id.to_string()))?;
            Ok(())
        })
        .await
    }

    /// Add `actor_id` to the ban list of `location_id`. Returns false when
    /// already banned.
    pub async fn ban(&self, location_id: &str, actor_id: &str) -> Result<bool, WorldError> {
        let mut added = false;
        self.update_record::<Location, _>(TableKind::Locations, location_id, |loc| {
            let banned = loc.banned.get_or_insert_with(Vec::new);
            if !banned.iter().any(|b| b == actor_id) {
                banned.push(actor_id.to_string());
                added = true;
            }
        })
        .await?;
        Ok(added)
    }

    /// Remove `actor_id` from the ban list of `location_id`. Returns false
    /// when they were not banned.
    pub async fn unban(&self, location_id: &str, actor_id: &str) -> Result<bool, WorldError> {
        let mut removed = false;
        self.update_record::<Location, _>(TableKind::Locations, location_id, |loc| {
            if let Some(banned) = loc.banned.as_mut() {
                let before = banned.len();
                banned.retain(|b| b != actor_id);
                removed = banned.len() != before;
            }
        })
        .await?;
        Ok(removed)
    }

    /// Object id `actor_id` is sitting on, if any.
    pub async fn sitting_on(&self, actor_id: &str) -> Result<Option<String>, WorldError> {
        let value = store::get_or(self.store.as_ref(), &store::sitting_key(actor_id), Value::Null).await?;
        Ok(match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    pub async fn set_sitting(&self, actor_id: &str, object_id: &str) -> Result<(), WorldError> {
        self.store
            .put(&store::sitting_key(actor_id), json!(object_id))
            .await?;
        Ok(())
    }

    pub async fn clear_sitting(&self, actor_id: &str) -> Result<(), WorldError> {
        self.store.delete(&store::sitting_key(actor_id)).await?;
        Ok(())
    }

    async fn load_admins(&self) -> Result<Vec<String>, WorldError> {
        let value = store::get_or(self.store.as_ref(), KEY_ADMIN, json!([])).await?;
        Ok(match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            other => {
                warn!("Admin set is not a list, treating as empty: {}", other);
                Vec::new()
            }
        })
    }

    pub async fn admins(&self) -> Result<Vec<String>, WorldError> {
        let _guard = self.admin_lock.lock().await;
        self.load_admins().await
    }

    pub async fn is_admin(&self, actor_id: &str) -> Result<bool, WorldError> {
        Ok(self.admins().await?.iter().any(|a| a == actor_id))
    }

    /// Returns false when `actor_id` was already an admin.
    pub async fn add_admin(&self, actor_id: &str) -> Result<bool, WorldError> {
        let _guard = self.admin_lock.lock().await;
        let mut admins = self.load_admins().await?;
        if admins.iter().any(|a| a == actor_id) {
            return Ok(false);
        }
        admins.push(actor_id.to_string());
        self.store.put(KEY_ADMIN, json!(admins)).await?;
        Ok(true)
    }

    /// Removing a non-member is a no-op that returns false.
    pub async fn remove_admin(&self, actor_id: &str) -> Result<bool, WorldError> {
        let _guard = self.admin_lock.lock().await;
        let mut admins = self.load_admins().await?;
        let before = admins.len();
        admins.retain(|a| a != actor_id);
        if admins.len() == before {
            return Ok(false);
        }
        self.store.put(KEY_ADMIN, json!(admins)).await?;
        Ok(true)
    }

    /// Raw read of any key. Table keys are read under their lock.
    pub async fn raw_get(&self, key: &str) -> Result<Value, StoreError> {
        let _guard = self.raw_lock(key).await;
        self.store.get(key).await
    }

    pub async fn raw_put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.raw_lock(key).await;
        self.store.put(key, value).await
    }

    pub async fn raw_delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.raw_lock(key).await;
        self.store.delete(key).await
    }

    async fn raw_lock(&self, key: &str) -> Option<MutexGuard<'_, ()>> {
        if key == KEY_ADMIN {
            return Some(self.admin_lock.lock().await);
        }
        match TableKind::for_key(key) {
            Some(kind) => Some(self.lock(kind).await),
            None => None,
        }
    }
}
