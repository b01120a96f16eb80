//! Collection bindings for the portal's record types.

use ehm_accounting::LedgerAccount;
use ehm_auth::UserAccount;
use ehm_bookings::Reservation;
use ehm_core::{CodePrefix, ContactKeys};
use ehm_invoicing::Invoice;
use ehm_parties::{Customer, Supplier};

use super::Document;

pub const CUSTOMERS: &str = "customers";
pub const LEDGERS: &str = "ledgers";
pub const USERS: &str = "users";

impl Document for Customer {
    const COLLECTION: &'static str = CUSTOMERS;

    fn contact_keys(&self) -> ContactKeys {
        Customer::contact_keys(self)
    }
}

impl Document for Supplier {
    const COLLECTION: &'static str = CodePrefix::Supplier.collection();

    fn code(&self) -> Option<&str> {
        Some(&self.supplier_code)
    }

    fn contact_keys(&self) -> ContactKeys {
        Supplier::contact_keys(self)
    }
}

impl Document for Reservation {
    const COLLECTION: &'static str = CodePrefix::Reservation.collection();

    fn code(&self) -> Option<&str> {
        Some(&self.reservation_number)
    }
}

impl Document for Invoice {
    const COLLECTION: &'static str = CodePrefix::Invoice.collection();

    fn code(&self) -> Option<&str> {
        Some(&self.invoice_number)
    }
}

impl Document for LedgerAccount {
    const COLLECTION: &'static str = LEDGERS;

    fn code(&self) -> Option<&str> {
        Some(&self.code)
    }
}

impl Document for UserAccount {
    const COLLECTION: &'static str = USERS;

    fn contact_keys(&self) -> ContactKeys {
        ContactKeys::new(Some(self.email.as_str()), None)
    }
}
