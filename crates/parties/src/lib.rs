//! Parties domain module (customers and suppliers).
//!
//! Pure record shapes plus create/patch validation; no IO, no HTTP, no storage.

pub mod customer;
pub mod supplier;

pub use customer::{Customer, CustomerPatch, CustomerType, NewCustomer};
pub use supplier::{Bju, NewSupplier, Supplier, SupplierPatch, SupplierType};
