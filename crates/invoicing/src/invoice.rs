use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ehm_core::date::parse_date;
use ehm_core::text::clean;
use ehm_core::{
    choice_enum, parse_choice, DomainError, DomainResult, Entity, RecordId, UserId, Violations,
};

pub const DEFAULT_CURRENCY: &str = "EGP";

choice_enum! {
    /// Invoice status lifecycle.
    pub enum InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Draft
    }
}

/// Invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub description: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Total billed on an invoice: `amount + tax`.
///
/// Computed once at creation and stored; later edits of `amount` or
/// `tax_amount` leave it untouched.
pub fn compute_total(amount: f64, tax_amount: f64) -> f64 {
    amount + tax_amount
}

/// An invoice. `invoice_number` and `total_amount` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: RecordId,
    pub invoice_number: String,
    pub reservation: RecordId,
    pub customer: RecordId,
    pub invoice_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Invoice {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemInput {
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total: Option<f64>,
}

fn check_items(v: &mut Violations, items: Vec<InvoiceItemInput>) -> Vec<InvoiceItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let quantity = item.quantity.unwrap_or(1.0);
            let unit_price = item.unit_price.unwrap_or(0.0);
            v.non_negative(&format!("items[{i}].quantity"), Some(quantity));
            v.non_negative(&format!("items[{i}].unitPrice"), Some(unit_price));
            v.non_negative(&format!("items[{i}].total"), item.total);
            InvoiceItem {
                description: clean(item.description),
                quantity,
                unit_price,
                total: item.total.unwrap_or(quantity * unit_price),
            }
        })
        .collect()
}

fn parse_ref(v: &mut Violations, field: &str, raw: Option<&str>) -> Option<RecordId> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<RecordId>() {
        Ok(id) => Some(id),
        Err(_) => {
            v.push(field, format!("Invalid {field} id"));
            None
        }
    }
}

fn parse_when(v: &mut Violations, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        v.push(field, format!("{field} must be a valid date"));
    }
    parsed
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub reservation: Option<String>,
    pub customer: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItemInput>,
}

/// Create input that passed field validation. The caller resolves the
/// references and allocates the number.
#[derive(Debug, Clone)]
pub struct ValidInvoice {
    pub reservation: RecordId,
    pub customer: Option<RecordId>,
    invoice_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    amount: f64,
    tax_amount: f64,
    currency: Option<String>,
    status: InvoiceStatus,
    notes: Option<String>,
    items: Vec<InvoiceItem>,
}

impl NewInvoice {
    pub fn validate(self) -> DomainResult<ValidInvoice> {
        let mut v = Violations::new();
        if self.reservation.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            v.push("reservation", "Reservation is required");
        }
        let reservation = parse_ref(&mut v, "reservation", self.reservation.as_deref());
        let customer = parse_ref(&mut v, "customer", self.customer.as_deref());
        let invoice_date = parse_when(&mut v, "invoiceDate", self.invoice_date.as_deref());
        let due_date = parse_when(&mut v, "dueDate", self.due_date.as_deref());
        if self.amount.is_none() {
            v.push("amount", "Amount is required");
        }
        v.non_negative("amount", self.amount);
        v.non_negative("taxAmount", self.tax_amount);
        let status = parse_choice::<InvoiceStatus>(
            &mut v,
            "status",
            self.status.as_deref(),
            &InvoiceStatus::allowed(),
        );
        let items = check_items(&mut v, self.items);
        v.into_result()?;

        let (Some(reservation), Some(amount)) = (reservation, self.amount) else {
            return Err(DomainError::field("reservation", "Reservation is required"));
        };

        Ok(ValidInvoice {
            reservation,
            customer,
            invoice_date,
            due_date,
            amount,
            tax_amount: self.tax_amount.unwrap_or(0.0),
            currency: clean(self.currency),
            status: status.unwrap_or_default(),
            notes: clean(self.notes),
            items,
        })
    }
}

impl ValidInvoice {
    pub fn into_invoice(
        self,
        invoice_number: String,
        customer: RecordId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Invoice {
        Invoice {
            id: RecordId::new(),
            invoice_number,
            reservation: self.reservation,
            customer,
            invoice_date: self.invoice_date.unwrap_or(now),
            due_date: self.due_date,
            amount: self.amount,
            tax_amount: self.tax_amount,
            total_amount: compute_total(self.amount, self.tax_amount),
            currency: self.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            status: self.status,
            notes: self.notes,
            items: self.items,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. Neither the number nor the total can be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    pub reservation: Option<String>,
    pub customer: Option<String>,
    pub invoice_date: Option<String>,
    pub due_date: Option<String>,
    pub amount: Option<f64>,
    pub tax_amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub items: Option<Vec<InvoiceItemInput>>,
}

impl InvoicePatch {
    /// Parsed `(reservation, customer)` references the caller must check exist.
    pub fn references(&self) -> (Option<RecordId>, Option<RecordId>) {
        let parse = |raw: &Option<String>| raw.as_deref().and_then(|r| r.trim().parse().ok());
        (parse(&self.reservation), parse(&self.customer))
    }

    pub fn apply(self, invoice: &mut Invoice, now: DateTime<Utc>) -> DomainResult<()> {
        let mut v = Violations::new();
        let reservation = parse_ref(&mut v, "reservation", self.reservation.as_deref());
        let customer = parse_ref(&mut v, "customer", self.customer.as_deref());
        let invoice_date = parse_when(&mut v, "invoiceDate", self.invoice_date.as_deref());
        let due_date = parse_when(&mut v, "dueDate", self.due_date.as_deref());
        v.non_negative("amount", self.amount);
        v.non_negative("taxAmount", self.tax_amount);
        let status = parse_choice::<InvoiceStatus>(
            &mut v,
            "status",
            self.status.as_deref(),
            &InvoiceStatus::allowed(),
        );
        let items = self.items.map(|items| check_items(&mut v, items));
        v.into_result()?;

        if let Some(reservation) = reservation {
            invoice.reservation = reservation;
        }
        if let Some(customer) = customer {
            invoice.customer = customer;
        }
        if let Some(date) = invoice_date {
            invoice.invoice_date = date;
        }
        if due_date.is_some() {
            invoice.due_date = due_date;
        }
        if let Some(amount) = self.amount {
            invoice.amount = amount;
        }
        if let Some(tax) = self.tax_amount {
            invoice.tax_amount = tax;
        }
        if let Some(currency) = clean(self.currency) {
            invoice.currency = currency;
        }
        if let Some(status) = status {
            invoice.status = status;
        }
        if self.notes.is_some() {
            invoice.notes = clean(self.notes);
        }
        if let Some(items) = items {
            invoice.items = items;
        }
        invoice.updated_at = now;
        Ok(())
    }
}
