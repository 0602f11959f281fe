//! The base contract every stored entity satisfies.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::id::DocumentId;

/// A storable document type.
///
/// Implementors are plain serde structs whose identifier serializes under
/// the `_id` key. The stored representation is mapped to `Self` through
/// [`StoredDocument::into_document`](crate::types::StoredDocument::into_document).
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection holding documents of this type.
    const COLLECTION: &'static str;

    /// The creation payload: every field except the identifier.
    type Payload: Serialize + Send + Sync;

    /// The document identifier.
    fn id(&self) -> DocumentId;
}
