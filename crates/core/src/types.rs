use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` when the identifier is empty or only whitespace.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    TenantId,
    "Identifies one account's isolated data space. Equal to the owning principal's id."
);
newtype_string!(
    CollectionName,
    "Name of a document collection inside a tenant."
);
newtype_string!(DocumentId, "Document identifier, unique within a collection.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_from_str() {
        let c = CollectionName::from("lensInventory");
        assert_eq!(c.as_str(), "lensInventory");
        assert_eq!(&*c, "lensInventory");
    }

    #[test]
    fn newtype_from_string() {
        let tenant = TenantId::from("uid-42".to_string());
        assert_eq!(tenant.to_string(), "uid-42");
    }

    #[test]
    fn newtype_serde_is_transparent() {
        let id = DocumentId::new("doc-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"doc-123\"");
        let back: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn blank_detection() {
        assert!(TenantId::new("").is_blank());
        assert!(TenantId::new("   ").is_blank());
        assert!(!TenantId::new("u1").is_blank());
    }
}
