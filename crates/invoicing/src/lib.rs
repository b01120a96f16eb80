//! Invoicing domain module.
//!
//! Invoices reference a reservation and a customer, carry line items and a
//! total fixed at creation.

pub mod invoice;

pub use invoice::{
    compute_total, Invoice, InvoiceItem, InvoiceItemInput, InvoicePatch, InvoiceStatus,
    NewInvoice, ValidInvoice,
};
