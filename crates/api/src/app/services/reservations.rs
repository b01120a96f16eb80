use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use ehm_bookings::{NewReservation, Reservation, ReservationPatch};
use ehm_core::{CodePrefix, FieldError, RecordId, UserId};
use ehm_infra::store::{Clause, Page, RecordFilter};
use ehm_parties::Customer;

use super::{date_range, AppServices};
use crate::app::dto::{present, PageParams, Pagination};
use crate::app::errors::{Resource, ServiceError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// The customer fields embedded in reservation listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: RecordId,
    pub customer_name: String,
    pub email: Option<String>,
    pub telephone: String,
}

impl From<&Customer> for CustomerSummary {
    fn from(c: &Customer) -> Self {
        Self {
            id: c.id,
            customer_name: c.customer_name.clone(),
            email: c.email.clone(),
            telephone: c.telephone.clone(),
        }
    }
}

/// A reservation with its `customer` reference replaced by `customer`
/// (or `null` when the customer no longer exists).
pub fn embed_customer<C: Serialize>(
    reservation: &Reservation,
    customer: Option<&C>,
) -> Result<JsonValue, ServiceError> {
    let mut value = serde_json::to_value(reservation)
        .map_err(|e| ServiceError::server("serializing reservation", e))?;
    let embedded = match customer {
        Some(c) => serde_json::to_value(c).map_err(|e| ServiceError::server("serializing customer", e))?,
        None => JsonValue::Null,
    };
    if let Some(obj) = value.as_object_mut() {
        obj.insert("customer".to_string(), embedded);
    }
    Ok(value)
}

fn unknown_customer() -> ServiceError {
    ServiceError::Validation(vec![FieldError::new("customer", "Customer not found")])
}

impl AppServices {
    async fn customer_exists(&self, id: RecordId, action: &'static str) -> Result<Customer, ServiceError> {
        self.customers
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Customer, action))?
            .ok_or_else(unknown_customer)
    }

    /// Summaries for the customers referenced by `reservations`, keyed by id.
    async fn customer_summaries(
        &self,
        reservations: &[Reservation],
    ) -> Result<HashMap<RecordId, CustomerSummary>, ServiceError> {
        let mut ids: Vec<JsonValue> = reservations
            .iter()
            .map(|r| JsonValue::from(r.customer.to_string()))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let customers = self
            .customers
            .find(&RecordFilter::new().is_in("id", ids), Page::all())
            .await
            .map_err(ServiceError::store(Resource::Customer, "fetching reservations"))?;
        Ok(customers.iter().map(|c| (c.id, CustomerSummary::from(c))).collect())
    }

    /// Filtered, newest-first page of reservations with customer summaries embedded.
    ///
    /// `search` matches the reservation number or the customer's name.
    pub async fn list_reservations(
        &self,
        q: &ReservationQuery,
    ) -> Result<(Vec<JsonValue>, Pagination), ServiceError> {
        let (from, to) = date_range(
            ("startDate", present(&q.start_date)),
            ("endDate", present(&q.end_date)),
        )?;
        let mut filter = RecordFilter::new()
            .eq_opt("type", present(&q.kind))
            .eq_opt("status", present(&q.status))
            .created_between(from, to);

        if let Some(needle) = present(&q.search) {
            let matching_customers = self
                .customers
                .find(&RecordFilter::new().contains("customerName", Some(needle)), Page::all())
                .await
                .map_err(ServiceError::store(Resource::Customer, "fetching reservations"))?;
            let ids = matching_customers
                .iter()
                .map(|c| JsonValue::from(c.id.to_string()))
                .collect();
            filter = filter.any_of(vec![
                Clause::Contains("reservationNumber".into(), needle.to_string()),
                Clause::In("customer".into(), ids),
            ]);
        }

        let paging = PageParams {
            page: q.page,
            limit: q.limit,
        };
        let err = || ServiceError::store(Resource::Reservation, "fetching reservations");
        let total = self.reservations.count(&filter).await.map_err(err())?;
        let page = self
            .reservations
            .find(&filter, paging.window())
            .await
            .map_err(err())?;

        let summaries = self.customer_summaries(&page).await?;
        let items = page
            .iter()
            .map(|r| embed_customer(r, summaries.get(&r.customer)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, Pagination::new(&paging, total)))
    }

    pub async fn get_reservation(&self, id: RecordId) -> Result<Reservation, ServiceError> {
        self.reservations
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Reservation, "fetching reservation"))?
            .ok_or(ServiceError::NotFound(Resource::Reservation))
    }

    /// A reservation with its full customer record embedded.
    pub async fn reservation_detail(&self, id: RecordId) -> Result<JsonValue, ServiceError> {
        let reservation = self.get_reservation(id).await?;
        let customer = self
            .customers
            .get(reservation.customer)
            .await
            .map_err(ServiceError::store(Resource::Customer, "fetching reservation"))?;
        embed_customer(&reservation, customer.as_ref())
    }

    /// Validate, check the customer, allocate a `RES` number (time-based
    /// fallback when the sequence is unavailable), insert.
    pub async fn create_reservation(
        &self,
        input: NewReservation,
        actor: Option<UserId>,
    ) -> Result<JsonValue, ServiceError> {
        let valid = input.validate()?;
        let customer = self.customer_exists(valid.customer, "creating reservation").await?;

        let err = || ServiceError::store(Resource::Reservation, "creating reservation");
        let number = self
            .codes
            .next_code(CodePrefix::Reservation)
            .await
            .map_err(err())?;
        let reservation = valid.into_reservation(number, actor, Utc::now());
        let reservation = self.reservations.insert(reservation).await.map_err(err())?;
        info!(reservation_number = %reservation.reservation_number, "reservation created");

        embed_customer(&reservation, Some(&CustomerSummary::from(&customer)))
    }

    pub async fn update_reservation(
        &self,
        id: RecordId,
        patch: ReservationPatch,
    ) -> Result<JsonValue, ServiceError> {
        let err = || ServiceError::store(Resource::Reservation, "updating reservation");
        let mut reservation = self
            .reservations
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::Reservation))?;
        if let Some(customer) = patch.customer() {
            self.customer_exists(customer, "updating reservation").await?;
        }

        patch.apply(&mut reservation, Utc::now())?;
        let reservation = self.reservations.update(reservation).await.map_err(err())?;
        let customer = self
            .customers
            .get(reservation.customer)
            .await
            .map_err(ServiceError::store(Resource::Customer, "updating reservation"))?;
        embed_customer(&reservation, customer.as_ref().map(CustomerSummary::from).as_ref())
    }

    pub async fn delete_reservation(&self, id: RecordId) -> Result<(), ServiceError> {
        let removed = self
            .reservations
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::Reservation, "deleting reservation"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::Reservation));
        }
        info!(reservation_id = %id, "reservation deleted");
        Ok(())
    }
}
