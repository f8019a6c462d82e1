//! Names of index migrations that gate query features.
//!
//! Some filters rely on fields that only exist once a backfill has run. The builders consult
//! [`MigrationSettings`](crate::MigrationSettings) with these names before emitting them.

/// Work item documents carry `milestone_title` and `milestone_id`.
pub const BACKFILL_WORK_ITEM_MILESTONE_DATA: &str = "backfill_work_item_milestone_data";

/// Work item documents carry `label_names` and other extra fields.
pub const ADD_EXTRA_FIELDS_TO_WORK_ITEMS: &str = "add_extra_fields_to_work_items";

/// Work item embeddings were re-indexed into `embedding_1`.
pub const BACKFILL_WORK_ITEM_EMBEDDINGS_1: &str = "backfill_work_item_embeddings1";

/// Every migration name the builders know about.
pub const KNOWN: &[&str] = &[
    BACKFILL_WORK_ITEM_MILESTONE_DATA,
    ADD_EXTRA_FIELDS_TO_WORK_ITEMS,
    BACKFILL_WORK_ITEM_EMBEDDINGS_1,
];
