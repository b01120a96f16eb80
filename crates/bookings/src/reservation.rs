use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ehm_core::date::parse_date;
use ehm_core::text::{clean, required};
use ehm_core::{choice_enum, parse_choice, DomainResult, Entity, RecordId, UserId, Violations};

pub const DEFAULT_CURRENCY: &str = "EGP";

choice_enum! {
    pub enum ReservationType {
        Flight => "flight",
        Hotel => "hotel",
        Visa => "visa",
        Transportation => "transportation",
        Tour => "tour",
        Package => "package",
    }
}

choice_enum! {
    /// Reservation lifecycle status.
    pub enum ReservationStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl Default for ReservationStatus {
    fn default() -> Self {
        ReservationStatus::Pending
    }
}

impl ReservationStatus {
    /// Statuses whose amounts count towards revenue.
    pub const REVENUE: &'static [ReservationStatus] =
        &[ReservationStatus::Confirmed, ReservationStatus::Completed];

    pub fn counts_as_revenue(self) -> bool {
        Self::REVENUE.contains(&self)
    }
}

/// A reservation. `reservation_number` is assigned once at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: RecordId,
    pub reservation_number: String,
    pub customer: RecordId,
    #[serde(rename = "type")]
    pub kind: ReservationType,
    pub destination: String,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub passengers: u32,
    pub amount: f64,
    pub currency: String,
    pub status: ReservationStatus,
    pub branch: Option<String>,
    pub sales_officer: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Reservation {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn parse_customer(v: &mut Violations, raw: Option<&str>) -> Option<RecordId> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<RecordId>() {
        Ok(id) => Some(id),
        Err(_) => {
            v.push("customer", "Invalid customer id");
            None
        }
    }
}

fn parse_day(v: &mut Violations, field: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        v.push(field, format!("{field} must be a valid date"));
    }
    parsed
}

fn check_passengers(v: &mut Violations, passengers: Option<i64>) -> Option<u32> {
    let n = passengers?;
    match u32::try_from(n) {
        Ok(n) if n >= 1 => Some(n),
        _ => {
            v.push("passengers", "Passengers must be at least 1");
            None
        }
    }
}

fn check_stay(v: &mut Violations, check_in: Option<DateTime<Utc>>, check_out: Option<DateTime<Utc>>) {
    if let (Some(start), Some(end)) = (check_in, check_out) {
        if end < start {
            v.push("checkOut", "Check-out cannot be before check-in");
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    pub customer: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub destination: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub passengers: Option<i64>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub branch: Option<String>,
    pub sales_officer: Option<String>,
    pub notes: Option<String>,
}

/// A create input that passed field validation; only the code is missing.
#[derive(Debug, Clone)]
pub struct ValidReservation {
    pub customer: RecordId,
    input: NewReservation,
    kind: ReservationType,
    status: ReservationStatus,
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
    passengers: u32,
    amount: f64,
}

impl NewReservation {
    pub fn validate(self) -> DomainResult<ValidReservation> {
        let mut v = Violations::new();
        if self.customer.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            v.push("customer", "Customer is required");
        }
        let customer = parse_customer(&mut v, self.customer.as_deref());
        if self.kind.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            v.push("type", "Reservation type is required");
        }
        let kind = parse_choice::<ReservationType>(
            &mut v,
            "type",
            self.kind.as_deref(),
            &ReservationType::allowed(),
        );
        v.require("destination", self.destination.as_deref(), "Destination is required");
        let check_in = parse_day(&mut v, "checkIn", self.check_in.as_deref());
        let check_out = parse_day(&mut v, "checkOut", self.check_out.as_deref());
        check_stay(&mut v, check_in, check_out);
        let passengers = check_passengers(&mut v, self.passengers);
        if self.amount.is_none() {
            v.push("amount", "Amount is required");
        }
        v.non_negative("amount", self.amount);
        let status = parse_choice::<ReservationStatus>(
            &mut v,
            "status",
            self.status.as_deref(),
            &ReservationStatus::allowed(),
        );
        v.into_result()?;

        let (Some(customer), Some(kind), Some(amount)) = (customer, kind, self.amount) else {
            // Unreachable once the violations above are empty.
            return Err(ehm_core::DomainError::field("reservation", "incomplete input"));
        };

        Ok(ValidReservation {
            customer,
            kind,
            status: status.unwrap_or_default(),
            check_in,
            check_out,
            passengers: passengers.unwrap_or(1),
            amount,
            input: self,
        })
    }
}

impl ValidReservation {
    pub fn into_reservation(
        self,
        reservation_number: String,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Reservation {
        let input = self.input;
        Reservation {
            id: RecordId::new(),
            reservation_number,
            customer: self.customer,
            kind: self.kind,
            destination: required(input.destination),
            check_in: self.check_in,
            check_out: self.check_out,
            passengers: self.passengers,
            amount: self.amount,
            currency: clean(input.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            status: self.status,
            branch: clean(input.branch),
            sales_officer: clean(input.sales_officer),
            notes: clean(input.notes),
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update. The reservation number is not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPatch {
    pub customer: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub destination: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub passengers: Option<i64>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub branch: Option<String>,
    pub sales_officer: Option<String>,
    pub notes: Option<String>,
}

impl ReservationPatch {
    /// New customer reference, if the patch changes it (caller checks it exists).
    pub fn customer(&self) -> Option<RecordId> {
        self.customer.as_deref().and_then(|c| c.trim().parse().ok())
    }

    pub fn apply(self, reservation: &mut Reservation, now: DateTime<Utc>) -> DomainResult<()> {
        let mut v = Violations::new();
        let customer = parse_customer(&mut v, self.customer.as_deref());
        let kind = parse_choice::<ReservationType>(
            &mut v,
            "type",
            self.kind.as_deref(),
            &ReservationType::allowed(),
        );
        if self.destination.is_some() {
            v.require("destination", self.destination.as_deref(), "Destination cannot be empty");
        }
        let check_in = parse_day(&mut v, "checkIn", self.check_in.as_deref());
        let check_out = parse_day(&mut v, "checkOut", self.check_out.as_deref());
        check_stay(
            &mut v,
            check_in.or(reservation.check_in),
            check_out.or(reservation.check_out),
        );
        let passengers = check_passengers(&mut v, self.passengers);
        v.non_negative("amount", self.amount);
        let status = parse_choice::<ReservationStatus>(
            &mut v,
            "status",
            self.status.as_deref(),
            &ReservationStatus::allowed(),
        );
        v.into_result()?;

        if let Some(customer) = customer {
            reservation.customer = customer;
        }
        if let Some(kind) = kind {
            reservation.kind = kind;
        }
        if let Some(destination) = clean(self.destination) {
            reservation.destination = destination;
        }
        if check_in.is_some() {
            reservation.check_in = check_in;
        }
        if check_out.is_some() {
            reservation.check_out = check_out;
        }
        if let Some(passengers) = passengers {
            reservation.passengers = passengers;
        }
        if let Some(amount) = self.amount {
            reservation.amount = amount;
        }
        if let Some(currency) = clean(self.currency) {
            reservation.currency = currency;
        }
        if let Some(status) = status {
            reservation.status = status;
        }
        for (slot, value) in [
            (&mut reservation.branch, self.branch),
            (&mut reservation.sales_officer, self.sales_officer),
            (&mut reservation.notes, self.notes),
        ] {
            if value.is_some() {
                *slot = clean(value);
            }
        }
        reservation.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehm_core::DomainError;

    fn input(customer: RecordId) -> NewReservation {
        NewReservation {
            customer: Some(customer.to_string()),
            kind: Some("hotel".into()),
            destination: Some("Hurghada".into()),
            check_in: Some("2025-07-01".into()),
            check_out: Some("2025-07-08".into()),
            amount: Some(1500.0),
            ..NewReservation::default()
        }
    }

    fn field_names(err: DomainError) -> Vec<String> {
        let DomainError::InvalidFields(fields) = err else {
            panic!("expected field errors");
        };
        fields.into_iter().map(|f| f.field).collect()
    }

    #[test]
    fn create_applies_defaults() {
        let customer = RecordId::new();
        let r = input(customer)
            .validate()
            .unwrap()
            .into_reservation("RES000001".into(), None, Utc::now());

        assert_eq!(r.customer, customer);
        assert_eq!(r.passengers, 1);
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.currency, "EGP");
    }

    #[test]
    fn kind_serializes_as_type() {
        let r = input(RecordId::new())
            .validate()
            .unwrap()
            .into_reservation("RES000001".into(), None, Utc::now());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "hotel");
        assert_eq!(json["reservationNumber"], "RES000001");
    }

    #[test]
    fn required_fields_are_reported() {
        let err = NewReservation::default().validate().unwrap_err();
        assert_eq!(field_names(err), vec!["customer", "type", "destination", "amount"]);
    }

    #[test]
    fn stay_cannot_end_before_it_starts() {
        let mut new = input(RecordId::new());
        new.check_out = Some("2025-06-30".into());
        assert_eq!(field_names(new.validate().unwrap_err()), vec!["checkOut"]);
    }

    #[test]
    fn negative_amount_and_zero_passengers_are_rejected() {
        let mut new = input(RecordId::new());
        new.amount = Some(-5.0);
        new.passengers = Some(0);
        assert_eq!(field_names(new.validate().unwrap_err()), vec!["passengers", "amount"]);
    }

    #[test]
    fn patch_checks_stay_against_stored_dates() {
        let mut r = input(RecordId::new())
            .validate()
            .unwrap()
            .into_reservation("RES000001".into(), None, Utc::now());

        let err = ReservationPatch {
            check_out: Some("2025-06-01".into()),
            ..ReservationPatch::default()
        }
        .apply(&mut r, Utc::now())
        .unwrap_err();
        assert_eq!(field_names(err), vec!["checkOut"]);

        ReservationPatch {
            status: Some("confirmed".into()),
            ..ReservationPatch::default()
        }
        .apply(&mut r, Utc::now())
        .unwrap();
        assert!(r.status.counts_as_revenue());
        assert_eq!(r.reservation_number, "RES000001");
    }
}
