/// Ledger primary keys and owner ids are PostgreSQL BIGSERIAL / BIGINT.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
