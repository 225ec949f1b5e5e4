//! The fixed list of collections included in every backup.
//!
//! Changing the list is a release decision. Bump [`MANIFEST_VERSION`] when
//! collections are added or removed.

use optivault_core::CollectionName;

/// Version of the collection list below.
pub const MANIFEST_VERSION: u32 = 2;

/// Format version written to `metadata.version`.
pub const FORMAT_VERSION: &str = "2.0";

/// Advisory tag written to `metadata.securityLevel`.
pub const SECURITY_LEVEL: &str = "standard";

/// Collections exported by the backup assembler, in restore order.
pub const MANIFEST: &[&str] = &[
    "products",
    "lensInventory",
    "contactLenses",
    "frames",
    "sunglasses",
    "accessories",
    "customers",
    "prescriptions",
    "sales",
    "salesReturns",
    "purchases",
    "purchaseReturns",
    "suppliers",
    "vendors",
    "dispatches",
    "transactions",
    "ledgerEntries",
    "payments",
    "invoices",
    "stockTransfers",
    "settings",
    "shopSettings",
    "users",
    "counters",
];

/// The manifest as owned collection names.
#[must_use]
pub fn default_manifest() -> Vec<CollectionName> {
    MANIFEST.iter().copied().map(CollectionName::from).collect()
}
