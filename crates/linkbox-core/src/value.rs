//! Values that can live in a synchronized file

/// A value a [`SyncedFile`](crate::store::SyncedFile) can read from and write to disk
pub trait StoreValue: Sized {
    /// Decode file contents. Must tolerate missing optional fields.
    fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self>;

    /// Encode for writing. The output must parse back to an equal value.
    fn to_bytes(&self) -> serde_json::Result<Vec<u8>>;
}
