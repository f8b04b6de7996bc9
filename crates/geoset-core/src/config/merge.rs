//! Configuration merging logic
//!
//! Layers are merged as raw TOML tables before deserializing, so a later
//! layer only overrides the keys it actually sets. Nested tables merge key by
//! key; arrays (e.g. `modalities`) and scalars are replaced wholesale.

use toml::{Table, Value};

/// Merge `overlay` into `base` (overlay takes precedence).
pub fn merge_tables(mut base: Table, overlay: Table) -> Table {
    for (key, value) in overlay {
        let merged = match (base.remove(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                Value::Table(merge_tables(existing, incoming))
            }
            (_, incoming) => incoming,
        };
        base.insert(key, merged);
    }
    base
}
