//! Domain models for admin.
//!
//! Request and response shapes for storage, suppliers and the catalog, and
//! the staff identity kept in the session.

pub mod catalog;
pub mod session;
pub mod storage;
pub mod supplier;

pub use catalog::{
    NewProduct, Product, ProductFilter, ProductUpdate, ProductVariants, StockRefresh,
    VariantStock,
};
pub use session::{CurrentStaff, keys as session_keys};
pub use storage::{
    BulkReceipt, BulkReceive, Lot, LotFilter, LotPage, ReceiptError, ReceiveLot, UpdateLot,
};
pub use supplier::{Supplier, SupplierInput, SupplierSummary};
