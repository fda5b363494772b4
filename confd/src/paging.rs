//! Bulk-read pagination over the persisted store.
//!
//! Markers are ordinal offsets into the store's stable per-type iteration
//! order. Pages compose without omission or duplication as long as nothing
//! writes concurrently; no snapshot isolation is held across page fetches,
//! so concurrent mutation can skip or repeat objects (documented
//! limitation).

use confd_core::{BulkSlice, ConfdError, Result, Store};

/// Hard ceiling on objects per bulk read. Exceeding it is a client error,
/// never a silent clamp.
pub const MAX_BULK_OBJECTS: i64 = 1024;

/// Read one page of persisted objects for a resource type.
pub async fn page(
    store: &dyn Store,
    resource: &str,
    start_marker: i64,
    max_count: i64,
) -> Result<BulkSlice> {
    if max_count > MAX_BULK_OBJECTS {
        return Err(ConfdError::BulkTooLarge {
            requested: max_count,
            max: MAX_BULK_OBJECTS,
        });
    }

    let all = store.iterate(resource).await?;
    let total = all.len() as i64;
    let begin = start_marker.clamp(0, total);
    let end = (begin + max_count.max(0)).min(total);

    let objects: Vec<_> = all[begin as usize..end as usize].to_vec();
    let count = objects.len() as i64;
    let next_marker = begin + count;

    Ok(BulkSlice {
        objects,
        count,
        next_marker,
        more_exists: next_marker < total,
    })
}
