mod error;
mod key;
mod traits;

pub mod filesystem;
pub mod memory;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use key::{MAX_KEY_LEN, file_extension, generate_key, validate_key};
pub use traits::{BoxReader, ObjectStore};
