use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider-side reference to a registered file, reusable across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Provider resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
}

/// An uploaded literature file that has been registered with the provider.
/// Only the handle survives; the local bytes are gone once this exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedDocument {
    pub id: Uuid,
    pub local_name: String,
    pub handle: FileHandle,
    pub size_bytes: u64,
    pub staged_at: DateTime<Utc>,
}
