//! The diff/merge engine.
//!
//! Reconciles a caller-supplied object against persisted state, in one of
//! two modes: a whole-object merge driven by the update set, or an ordered
//! patch-operation list applied to a copy of the persisted object. Both
//! produce the merged object plus a per-field diff. Patch application is
//! all-or-nothing: the first bad operation fails the whole list and the
//! caller keeps the persisted object untouched.
//!
//! Key fields are never mutated in place. An update that would change a
//! key field is an implicit identity change and is rejected with
//! `KeyImmutable` before anything is dispatched.

use confd_core::{
    ConfdError, ConfigObject, DiffResult, PatchOp, PatchOpKind, Result, Schema, UpdateSet,
};

/// Whole-object merge: take the caller's value for every field named in
/// the update set that differs from persisted state, copy the rest from
/// persisted state.
pub fn merge_update(
    schema: &Schema,
    caller: &ConfigObject,
    persisted: &ConfigObject,
    update_set: &UpdateSet,
) -> Result<(ConfigObject, DiffResult)> {
    let mut merged = persisted.clone();
    let mut diff = DiffResult::new(schema.field_count());

    for (idx, field) in schema.fields().iter().enumerate() {
        if !update_set.contains(&field.name) {
            continue;
        }
        let caller_value = caller.get(&field.name).unwrap_or(&field.default);
        let persisted_value = persisted.get(&field.name).unwrap_or(&field.default);
        if caller_value == persisted_value {
            continue;
        }
        if field.key {
            // Key fields may appear in a key-addressed request, but they
            // may never carry a new value.
            return Err(ConfdError::KeyImmutable);
        }
        merged.set(&field.name, caller_value.clone());
        diff.mark(idx);
    }

    check_key_unchanged(schema, persisted, &merged)?;
    Ok((merged, diff))
}

/// Patch merge: apply the operations in list order to a copy of the
/// persisted object. Every operation's path must resolve to a schema
/// field; a remove resets the field to its schema default.
pub fn apply_patch(
    schema: &Schema,
    persisted: &ConfigObject,
    ops: &[PatchOp],
) -> Result<(ConfigObject, DiffResult)> {
    let mut merged = persisted.clone();
    let mut diff = DiffResult::new(schema.field_count());

    for op in ops {
        let name = op.field_name();
        let idx = schema
            .field_index(name)
            .ok_or_else(|| ConfdError::patch_invalid(format!("unresolvable path {}", op.path)))?;
        match op.op {
            PatchOpKind::Add | PatchOpKind::Replace => {
                let value = op
                    .value
                    .clone()
                    .ok_or_else(|| ConfdError::patch_invalid(format!("missing value for {}", op.path)))?;
                merged.set(name, value);
            }
            PatchOpKind::Remove => {
                merged.set(name, schema.fields()[idx].default.clone());
            }
        }
        diff.mark(idx);
    }

    check_key_unchanged(schema, persisted, &merged)?;
    Ok((merged, diff))
}

/// Post-merge invariant: the merged object's natural key must equal the
/// persisted object's natural key.
fn check_key_unchanged(schema: &Schema, persisted: &ConfigObject, merged: &ConfigObject) -> Result<()> {
    if schema.natural_key(persisted)? != schema.natural_key(merged)? {
        return Err(ConfdError::KeyImmutable);
    }
    Ok(())
}
