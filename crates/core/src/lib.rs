pub mod error;
pub mod principal;
pub mod types;
pub mod value;

pub use error::CoreError;
pub use principal::Principal;
pub use types::{CollectionName, DocumentId, TenantId};
pub use value::{Document, TIMESTAMP_TAG, Value, format_timestamp, tagged_timestamp};
