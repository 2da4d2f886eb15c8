//! Typed records stored in named collections

use serde::de::DeserializeOwned;

/// Field every collection is listed by
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A document shape that lives in one collection
pub trait Record: DeserializeOwned {
    /// Collection the records are stored in
    const COLLECTION: &'static str;

    /// Human name used in error messages
    const KIND: &'static str;

    /// Attach the store-assigned document identifier
    fn set_id(&mut self, id: String);
}
