// Session ids are UUIDv7 so they sort by creation time. User ids use
// PG's gen_random_uuid() (v4) where ordering is irrelevant.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
