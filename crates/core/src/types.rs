/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Record counts as stored in the log table (PostgreSQL BIGINT).
pub type RecordCount = i64;
