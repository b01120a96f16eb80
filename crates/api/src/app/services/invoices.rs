use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use ehm_core::{CodePrefix, FieldError, RecordId, UserId};
use ehm_infra::store::{search_fields, RecordFilter};
use ehm_invoicing::{Invoice, InvoicePatch, NewInvoice};

use super::{parse_id, AppServices};
use crate::app::dto::{present, PageParams, Pagination};
use crate::app::errors::{Resource, ServiceError};

const SEARCH_FIELDS: &[&str] = &["invoiceNumber", "notes"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub customer: Option<String>,
    pub reservation: Option<String>,
}

fn missing(field: &str, what: &str) -> ServiceError {
    ServiceError::Validation(vec![FieldError::new(field, format!("{what} not found"))])
}

impl AppServices {
    pub async fn list_invoices(
        &self,
        q: &InvoiceQuery,
    ) -> Result<(Vec<Invoice>, Pagination), ServiceError> {
        let customer = present(&q.customer)
            .map(|raw| parse_id(Resource::Customer, raw))
            .transpose()?;
        let reservation = present(&q.reservation)
            .map(|raw| parse_id(Resource::Reservation, raw))
            .transpose()?;
        let mut filter = RecordFilter::new()
            .eq_opt("status", present(&q.status))
            .eq_opt("customer", customer.map(|id| id.to_string()))
            .eq_opt("reservation", reservation.map(|id| id.to_string()));
        if let Some(needle) = present(&q.search) {
            filter = filter.any_of(search_fields(SEARCH_FIELDS, needle));
        }

        let paging = PageParams {
            page: q.page,
            limit: q.limit,
        };
        let err = || ServiceError::store(Resource::Invoice, "fetching invoices");
        let total = self.invoices.count(&filter).await.map_err(err())?;
        let items = self
            .invoices
            .find(&filter, paging.window())
            .await
            .map_err(err())?;
        Ok((items, Pagination::new(&paging, total)))
    }

    pub async fn get_invoice(&self, id: RecordId) -> Result<Invoice, ServiceError> {
        self.invoices
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Invoice, "fetching invoice"))?
            .ok_or(ServiceError::NotFound(Resource::Invoice))
    }

    /// Customer the invoice is billed to: the given one (which must exist) or
    /// the reservation's.
    async fn billed_customer(
        &self,
        reservation: RecordId,
        customer: Option<RecordId>,
        action: &'static str,
    ) -> Result<RecordId, ServiceError> {
        let booked = self
            .reservations
            .get(reservation)
            .await
            .map_err(ServiceError::store(Resource::Reservation, action))?
            .ok_or_else(|| missing("reservation", "Reservation"))?;
        match customer {
            None => Ok(booked.customer),
            Some(id) => {
                self.customers
                    .get(id)
                    .await
                    .map_err(ServiceError::store(Resource::Customer, action))?
                    .ok_or_else(|| missing("customer", "Customer"))?;
                Ok(id)
            }
        }
    }

    /// Validate, resolve references, allocate an `INV` number, insert.
    ///
    /// `totalAmount` is fixed here as `amount + taxAmount`. A failed number
    /// allocation aborts the creation.
    pub async fn create_invoice(
        &self,
        input: NewInvoice,
        actor: Option<UserId>,
    ) -> Result<Invoice, ServiceError> {
        let valid = input.validate()?;
        let customer = self
            .billed_customer(valid.reservation, valid.customer, "creating invoice")
            .await?;

        let err = || ServiceError::store(Resource::Invoice, "creating invoice");
        let number = self
            .codes
            .next_code(CodePrefix::Invoice)
            .await
            .map_err(err())?;
        let invoice = valid.into_invoice(number, customer, actor, Utc::now());
        let invoice = self.invoices.insert(invoice).await.map_err(err())?;
        info!(invoice_number = %invoice.invoice_number, total = invoice.total_amount, "invoice created");
        Ok(invoice)
    }

    /// Patch an invoice. The stored `totalAmount` is left as created.
    pub async fn update_invoice(
        &self,
        id: RecordId,
        patch: InvoicePatch,
    ) -> Result<Invoice, ServiceError> {
        let err = || ServiceError::store(Resource::Invoice, "updating invoice");
        let mut invoice = self
            .invoices
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::Invoice))?;

        let (reservation, customer) = patch.references();
        if reservation.is_some() || customer.is_some() {
            self.billed_customer(
                reservation.unwrap_or(invoice.reservation),
                customer,
                "updating invoice",
            )
            .await?;
        }

        patch.apply(&mut invoice, Utc::now())?;
        self.invoices.update(invoice).await.map_err(err())
    }

    pub async fn delete_invoice(&self, id: RecordId) -> Result<(), ServiceError> {
        let removed = self
            .invoices
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::Invoice, "deleting invoice"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::Invoice));
        }
        info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }
}
