//! Persistent world: locations, objects, and where every actor stands.
//!
//! Built on the [`crate::store::KvStore`] boundary only. Tables are seeded
//! from compiled-in defaults on first use and reconciled on every read so
//! new built-in entities and fields reach old databases without touching
//! anything users created.

pub mod errors;
pub mod model;
pub mod navigation;
pub mod objects;
pub mod reconcile;
pub mod types;

pub use errors::WorldError;
pub use model::{TableKind, WorldModel};
pub use navigation::GoOutcome;
pub use objects::ObjectRegistry;
pub use types::{Location, ObjectInstance, WorldObject, DEFAULT_LOCATION_ID, MISSING_NAME};
