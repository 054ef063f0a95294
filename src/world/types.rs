//! Record types for the world tables and the compiled-in defaults.
//!
//! Records are stored as JSON. Every optional field stays absent when it
//! was absent on disk, and unknown fields ride along in `extra`, so a
//! read-modify-write through these types never invents or drops data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Location id every actor starts at.
pub const DEFAULT_LOCATION_ID: &str = "home";
/// Id of the sentinel returned when an actor's stored location is gone.
pub const VOID_LOCATION_ID: &str = "deleted";
/// Marker returned for objects (or names) that cannot be resolved.
pub const MISSING_NAME: &str = "_MISSING";

/// A named place. `aliases` are matched case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,
    /// World partition tag; travel is limited to the current partition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<ObjectInstance>>,
    /// Reachable location ids. Informational only; `go` does not consult it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reach: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Location {
    /// Sentinel for a pointer whose target no longer exists.
    pub fn void() -> Self {
        Self {
            id: VOID_LOCATION_ID.to_string(),
            display_name: Some("Deleted Land".to_string()),
            aliases: None,
            world: None,
            objects: None,
            reach: None,
            banned: None,
            extra: Map::new(),
        }
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn aliases(&self) -> &[String] {
        self.aliases.as_deref().unwrap_or_default()
    }

    pub fn objects(&self) -> &[ObjectInstance] {
        self.objects.as_deref().unwrap_or_default()
    }

    pub fn is_banned(&self, actor_id: &str) -> bool {
        self.banned
            .as_ref()
            .is_some_and(|banned| banned.iter().any(|b| b == actor_id))
    }
}

/// An object definition: the static template plus whatever instance
/// fields the record carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: String,
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_props: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorldObject {
    pub fn display_name(&self) -> Option<&str> {
        self.static_props
            .as_ref()
            .and_then(|s| s.get("displayName"))
            .and_then(Value::as_str)
    }

    pub fn can_sit(&self) -> bool {
        self.static_props
            .as_ref()
            .and_then(|s| s.get("enableSit"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// A placed object: the definition minus its static bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Compiled-in object definitions.
pub fn default_objects() -> Vec<Value> {
    vec![json!({
        "id": "couch",
        "static": {
            "displayName": "Couch",
            "enableSit": true
        }
    })]
}

/// Compiled-in locations. `home` carries an instance of every default
/// object whose id it lists.
pub fn default_locations() -> Vec<Value> {
    vec![
        json!({
            "id": "home",
            "displayName": "Home",
            "aliases": ["inside", "in"],
            "world": "Earth",
            "objects": [default_instance("couch")],
            "reach": ["outside"]
        }),
        json!({
            "id": "outside",
            "displayName": "Outside",
            "aliases": ["out"],
            "world": "Earth",
            "reach": ["home"]
        }),
    ]
}

/// Compiled-in default for one location id, if there is one.
pub fn default_location(id: &str) -> Option<Value> {
    default_locations()
        .into_iter()
        .find(|loc| loc.get("id").and_then(Value::as_str) == Some(id))
}

fn default_instance(id: &str) -> Value {
    default_objects()
        .into_iter()
        .find(|obj| obj.get("id").and_then(Value::as_str) == Some(id))
        .map(|obj| strip_static(&obj))
        .unwrap_or_else(|| json!({ "id": id }))
}

/// Shallow copy of a record without its `static` field.
pub fn strip_static(record: &Value) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "static")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
