//! Progress photos: bytes live in an external blob store, metadata in the database.

mod blob;
mod service;

pub use blob::BlobStore;
pub use service::{PhotoService, PhotoView, SIGNED_URL_TTL_SECS};
