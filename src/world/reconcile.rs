//! Default reconciliation for persisted world tables.
//!
//! A table is an ordered list of JSON records keyed by their `id` field.
//! [`reconcile`] merges the compiled-in defaults into a persisted table:
//!
//! 1. A default whose id is absent is inserted directly after the nearest
//!    preceding default that is present. With no earlier default present it
//!    goes directly before the nearest later one, and at the front only
//!    when the table holds no defaults at all. Defaults keep their relative
//!    order either way.
//! 2. A default whose id is present backfills every top-level field the
//!    persisted record lacks. Existing fields are never overwritten and
//!    nested values are never merged.
//!
//! Records whose id matches no default are never touched, and neither are
//! entries that are not JSON objects. Applying the merge to its own output
//! changes nothing.

use serde_json::Value;

/// Outcome counters, useful for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub backfilled_fields: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.backfilled_fields > 0
    }
}

/// The `id` of a record, when it has a string one.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Index of the first record with `id`.
pub fn position_of(table: &[Value], id: &str) -> Option<usize> {
    table.iter().position(|r| record_id(r) == Some(id))
}

/// Merge `defaults` into `table` in place.
pub fn reconcile(table: &mut Vec<Value>, defaults: &[Value]) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (idx, default) in defaults.iter().enumerate() {
        let Some(id) = record_id(default) else {
            continue;
        };

        match position_of(table, id) {
            Some(pos) => {
                let (Value::Object(existing), Value::Object(template)) = (&mut table[pos], default)
                else {
                    continue;
                };
                for (key, value) in template {
                    if !existing.contains_key(key) {
                        existing.insert(key.clone(), value.clone());
                        report.backfilled_fields += 1;
                    }
                }
            }
            None => {
                let after_prev = defaults[..idx]
                    .iter()
                    .rev()
                    .filter_map(record_id)
                    .find_map(|prev| position_of(table, prev))
                    .map(|p| p + 1);
                let at = after_prev
                    .or_else(|| {
                        defaults[idx + 1..]
                            .iter()
                            .filter_map(record_id)
                            .find_map(|next| position_of(table, next))
                    })
                    .unwrap_or(0);
                table.insert(at, default.clone());
                report.inserted += 1;
            }
        }
    }

    report
}

/// Decode a stored table. `None` when the stored value is not an array.
pub fn table_from_value(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::types::{default_locations, default_objects};
    use serde_json::json;

    fn ids(table: &[Value]) -> Vec<&str> {
        table.iter().filter_map(record_id).collect()
    }

    #[test]
    fn empty_table_receives_all_defaults_in_order() {
        let mut table = Vec::new();
        let report = reconcile(&mut table, &default_locations());
        assert_eq!(ids(&table), vec!["home", "outside"]);
        assert_eq!(report.inserted, 2);
        assert_eq!(table, default_locations());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let tables = vec![
            Vec::new(),
            vec![json!({"id": "outside"})],
            vec![json!({"id": "shed", "displayName": "Shed"}), json!({"id": "home", "world": "Mars"})],
            vec![json!("garbage"), json!({"no_id": true})],
        ];
        for mut table in tables {
            reconcile(&mut table, &default_locations());
            let once = table.clone();
            let report = reconcile(&mut table, &default_locations());
            assert_eq!(table, once);
            assert!(!report.changed());
        }
    }

    #[test]
    fn backfills_missing_fields_without_overwriting() {
        let mut table = vec![json!({"id": "home", "displayName": "My Place", "aliases": []})];
        let report = reconcile(&mut table, &default_locations());
        let home = &table[0];
        assert_eq!(home["displayName"], "My Place");
        assert_eq!(home["aliases"], json!([]));
        assert_eq!(home["world"], "Earth");
        assert_eq!(home["reach"], json!(["outside"]));
        assert_eq!(report.backfilled_fields, 3);
    }

    #[test]
    fn backfill_is_shallow() {
        let mut table = vec![json!({"id": "couch", "static": {"displayName": "Sofa"}})];
        reconcile(&mut table, &default_objects());
        // the static bag exists, so its missing enableSit is not merged in
        assert_eq!(table[0]["static"], json!({"displayName": "Sofa"}));
    }

    #[test]
    fn custom_records_survive_untouched() {
        let shed = json!({"id": "shed", "displayName": "Shed", "world": "Earth"});
        let mut table = vec![shed.clone(), json!({"id": "outside"})];
        reconcile(&mut table, &default_locations());
        assert_eq!(ids(&table), vec!["shed", "home", "outside"]);
        assert_eq!(table[0], shed);
    }

    #[test]
    fn missing_default_lands_after_its_predecessor() {
        let mut table = vec![json!({"id": "home"}), json!({"id": "shed"})];
        reconcile(&mut table, &default_locations());
        assert_eq!(ids(&table), vec!["home", "outside", "shed"]);
    }

    #[test]
    fn missing_default_lands_before_its_successor() {
        let mut table = vec![json!({"id": "shed"}), json!({"id": "outside"}), json!({"id": "attic"})];
        reconcile(&mut table, &default_locations());
        assert_eq!(ids(&table), vec!["shed", "home", "outside", "attic"]);
    }

    #[test]
    fn table_without_defaults_gets_them_in_front() {
        let mut table = vec![json!({"id": "shed"})];
        reconcile(&mut table, &default_locations());
        assert_eq!(ids(&table), vec!["home", "outside", "shed"]);
    }

    #[test]
    fn only_arrays_decode_as_tables() {
        assert_eq!(table_from_value(json!({"home": {}})), None);
        assert_eq!(table_from_value(json!([1])).map(|t| t.len()), Some(1));
    }
}
