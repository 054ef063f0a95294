//! Object Registry: accessors over the reconciled object table.
//!
//! An object record is a static template (`static`: display name and
//! capability flags) plus instance fields. [`ObjectRegistry::instance`]
//! projects the record without its template, which is what a location
//! holds when an object is placed there.

use log::warn;
use serde_json::Value;

use crate::world::errors::WorldError;
use crate::world::model::{TableKind, WorldModel};
use crate::world::reconcile::position_of;
use crate::world::types::{ObjectInstance, WorldObject, MISSING_NAME};

pub struct ObjectRegistry<'a> {
    world: &'a WorldModel,
}

impl<'a> ObjectRegistry<'a> {
    pub fn new(world: &'a WorldModel) -> Self {
        Self { world }
    }

    pub async fn get(&self, id: &str) -> Result<Option<WorldObject>, WorldError> {
        let objects: Vec<WorldObject> = self.world.records(TableKind::Objects).await?;
        Ok(objects.into_iter().find(|o| o.id == id))
    }

    /// Replace the stored record sharing `obj.id`.
    pub async fn set(&self, obj: &WorldObject) -> Result<(), WorldError> {
        let encoded = serde_json::to_value(obj)
            .map_err(|source| WorldError::Malformed { entity: "object", source })?;
        self.world
            .update_table(TableKind::Objects, |table| {
                let pos = position_of(table, &obj.id).ok_or_else(|| WorldError::NotFound {
                    entity: "object",
                    id: obj.id.clone(),
                })?;
                table[pos] = encoded;
                Ok(())
            })
            .await
    }

    pub fn instance(obj: &WorldObject) -> ObjectInstance {
        ObjectInstance {
            id: obj.id.clone(),
            extra: obj.extra.clone(),
        }
    }

    /// Instance projection of the stored definition `id`.
    pub async fn new_instance(&self, id: &str) -> Result<Option<ObjectInstance>, WorldError> {
        Ok(self.get(id).await?.as_ref().map(Self::instance))
    }

    /// Display name of `id`, or [`MISSING_NAME`]. Never fails.
    pub async fn get_name(&self, id: &str) -> String {
        match self.get(id).await {
            Ok(Some(obj)) => obj.display_name().unwrap_or(MISSING_NAME).to_string(),
            Ok(None) => MISSING_NAME.to_string(),
            Err(e) => {
                warn!("Object name lookup for '{}' failed: {}", id, e);
                MISSING_NAME.to_string()
            }
        }
    }

    pub async fn static_property(&self, id: &str, prop: &str) -> Result<Option<Value>, WorldError> {
        Ok(self
            .get(id)
            .await?
            .and_then(|obj| obj.static_props)
            .and_then(|mut props| props.remove(prop)))
    }

    /// Set one static property. Returns false when the object is unknown.
    pub async fn set_static_property(
        &self,
        id: &str,
        prop: &str,
        value: Value,
    ) -> Result<bool, WorldError> {
        match self
            .world
            .update_record::<WorldObject, _>(TableKind::Objects, id, |obj| {
                obj.static_props
                    .get_or_insert_with(Default::default)
                    .insert(prop.to_string(), value);
            })
            .await
        {
            Ok(_) => Ok(true),
            Err(WorldError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, MemoryStore, KEY_OBJECTS};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn instance_drops_static_bag_only() {
        let obj: WorldObject = serde_json::from_value(json!({
            "id": "lamp",
            "static": {"displayName": "Lamp"},
            "lit": true
        }))
        .expect("parse");
        let inst = ObjectRegistry::instance(&obj);
        assert_eq!(serde_json::to_value(&inst).expect("encode"), json!({"id": "lamp", "lit": true}));
    }

    #[tokio::test]
    async fn names_fall_back_to_missing_marker() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(KEY_OBJECTS, json!([{"id": "rock"}]))
            .await
            .expect("put");
        let world = WorldModel::new(store);
        let objects = world.objects();
        assert_eq!(objects.get_name("couch").await, "Couch");
        assert_eq!(objects.get_name("rock").await, MISSING_NAME);
        assert_eq!(objects.get_name("ghost").await, MISSING_NAME);
    }

    #[tokio::test]
    async fn static_properties_persist() {
        let world = WorldModel::new(Arc::new(MemoryStore::new()));
        let objects = world.objects();
        assert!(objects
            .set_static_property("couch", "enableSit", json!(false))
            .await
            .expect("set"));
        assert_eq!(
            objects.static_property("couch", "enableSit").await.expect("get"),
            Some(json!(false))
        );
        assert!(!objects
            .set_static_property("ghost", "x", json!(1))
            .await
            .expect("unknown"));
        let couch = objects.get("couch").await.expect("get").expect("couch");
        assert!(!couch.can_sit());
        assert_eq!(
            objects.new_instance("couch").await.expect("instance").map(|i| i.id),
            Some("couch".to_string())
        );
    }

    #[tokio::test]
    async fn set_replaces_existing_record() {
        let world = WorldModel::new(Arc::new(MemoryStore::new()));
        let objects = world.objects();
        let mut couch = objects.get("couch").await.expect("get").expect("couch");
        couch.extra.insert("color".into(), json!("red"));
        objects.set(&couch).await.expect("set");
        let stored = objects.get("couch").await.expect("get").expect("couch");
        assert_eq!(stored.extra.get("color"), Some(&json!("red")));

        let ghost = WorldObject { id: "ghost".into(), static_props: None, extra: Default::default() };
        assert!(matches!(objects.set(&ghost).await, Err(WorldError::NotFound { .. })));
    }
}
