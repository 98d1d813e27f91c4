pub mod enums;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{KeyConflictPolicy, PriceListJoin, Relation, SortDirection, ZeroDenominatorPolicy};
pub use structs::{
    CombinedSummaryRow, PurchasePriceRecord, PurchaseRecord, RawSnapshot, SalesRecord, SummaryKey,
    VendorInvoiceRecord, VendorSummary,
};
