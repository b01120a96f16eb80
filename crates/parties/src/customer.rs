use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ehm_core::contact::normalize_email;
use ehm_core::text::{clean, required};
use ehm_core::{
    choice_enum, parse_choice, ContactKeys, DomainResult, Entity, RecordId, UserId, Violations,
};

choice_enum! {
    /// Individual traveller or company account.
    pub enum CustomerType {
        Individual => "Individual",
        Corporate => "Corporate",
    }
}

impl Default for CustomerType {
    fn default() -> Self {
        CustomerType::Individual
    }
}

/// A customer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: RecordId,
    pub customer_name: String,
    pub customer_type: CustomerType,
    pub telephone: String,
    pub additional_phone: Option<String>,
    pub email: Option<String>,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub passport_number: Option<String>,
    pub nationality: Option<String>,
    pub branch: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Customer {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Customer {
    pub fn contact_keys(&self) -> ContactKeys {
        ContactKeys::new(self.email.as_deref(), Some(self.telephone.as_str()))
    }
}

/// Create input. Every field is optional at the wire level so that all
/// missing ones are reported together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub customer_name: Option<String>,
    pub customer_type: Option<String>,
    pub telephone: Option<String>,
    pub additional_phone: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub passport_number: Option<String>,
    pub nationality: Option<String>,
    pub branch: Option<String>,
    pub notes: Option<String>,
}

impl NewCustomer {
    /// Contact keys the duplicate guard checks before insert.
    pub fn contact_keys(&self) -> ContactKeys {
        ContactKeys::new(self.email.as_deref(), self.telephone.as_deref())
    }

    pub fn into_customer(self, created_by: Option<UserId>, now: DateTime<Utc>) -> DomainResult<Customer> {
        let mut v = Violations::new();
        v.require("customerName", self.customer_name.as_deref(), "Customer name is required");
        v.require("telephone", self.telephone.as_deref(), "Telephone is required");
        v.require("country", self.country.as_deref(), "Country is required");
        let customer_type = parse_choice::<CustomerType>(
            &mut v,
            "customerType",
            self.customer_type.as_deref(),
            &CustomerType::allowed(),
        );
        v.into_result()?;

        Ok(Customer {
            id: RecordId::new(),
            customer_name: required(self.customer_name),
            customer_type: customer_type.unwrap_or_default(),
            telephone: required(self.telephone),
            additional_phone: clean(self.additional_phone),
            email: self.email.as_deref().and_then(normalize_email),
            country: required(self.country),
            city: clean(self.city),
            address: clean(self.address),
            national_id: clean(self.national_id),
            passport_number: clean(self.passport_number),
            nationality: clean(self.nationality),
            branch: clean(self.branch),
            notes: clean(self.notes),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. Absent fields are left alone; a blank optional field clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    pub customer_name: Option<String>,
    pub customer_type: Option<String>,
    pub telephone: Option<String>,
    pub additional_phone: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub passport_number: Option<String>,
    pub nationality: Option<String>,
    pub branch: Option<String>,
    pub notes: Option<String>,
}

impl CustomerPatch {
    pub fn apply(self, customer: &mut Customer, now: DateTime<Utc>) -> DomainResult<()> {
        let mut v = Violations::new();
        if self.customer_name.is_some() {
            v.require("customerName", self.customer_name.as_deref(), "Customer name cannot be empty");
        }
        if self.telephone.is_some() {
            v.require("telephone", self.telephone.as_deref(), "Telephone cannot be empty");
        }
        if self.country.is_some() {
            v.require("country", self.country.as_deref(), "Country cannot be empty");
        }
        let customer_type = parse_choice::<CustomerType>(
            &mut v,
            "customerType",
            self.customer_type.as_deref(),
            &CustomerType::allowed(),
        );
        v.into_result()?;

        if let Some(name) = clean(self.customer_name) {
            customer.customer_name = name;
        }
        if let Some(kind) = customer_type {
            customer.customer_type = kind;
        }
        if let Some(phone) = clean(self.telephone) {
            customer.telephone = phone;
        }
        if let Some(country) = clean(self.country) {
            customer.country = country;
        }
        if let Some(email) = self.email {
            customer.email = normalize_email(&email);
        }
        for (slot, value) in [
            (&mut customer.additional_phone, self.additional_phone),
            (&mut customer.city, self.city),
            (&mut customer.address, self.address),
            (&mut customer.national_id, self.national_id),
            (&mut customer.passport_number, self.passport_number),
            (&mut customer.nationality, self.nationality),
            (&mut customer.branch, self.branch),
            (&mut customer.notes, self.notes),
        ] {
            if value.is_some() {
                *slot = clean(value);
            }
        }
        customer.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ehm_core::DomainError;

    fn input() -> NewCustomer {
        NewCustomer {
            customer_name: Some(" Ahmed Ali ".into()),
            telephone: Some("+20 100 000 0000".into()),
            email: Some("Ahmed@Example.com".into()),
            country: Some("Egypt".into()),
            ..NewCustomer::default()
        }
    }

    #[test]
    fn create_applies_defaults_and_normalization() {
        let c = input().into_customer(None, Utc::now()).unwrap();
        assert_eq!(c.customer_name, "Ahmed Ali");
        assert_eq!(c.customer_type, CustomerType::Individual);
        assert_eq!(c.email.as_deref(), Some("ahmed@example.com"));
        assert_eq!(c.city, None);
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let err = NewCustomer::default().into_customer(None, Utc::now()).unwrap_err();
        let DomainError::InvalidFields(fields) = err else {
            panic!("expected field errors");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["customerName", "telephone", "country"]);
    }

    #[test]
    fn unknown_customer_type_is_rejected() {
        let mut new = input();
        new.customer_type = Some("Government".into());
        assert!(new.into_customer(None, Utc::now()).is_err());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let c = input().into_customer(None, Utc::now()).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["customerName"], "Ahmed Ali");
        assert_eq!(json["customerType"], "Individual");
    }

    #[test]
    fn patch_clears_blank_optionals_and_keeps_absent_ones() {
        let mut c = input().into_customer(None, Utc::now()).unwrap();
        c.city = Some("Giza".into());
        c.branch = Some("Cairo".into());

        CustomerPatch {
            city: Some("  ".into()),
            customer_type: Some("Corporate".into()),
            ..CustomerPatch::default()
        }
        .apply(&mut c, Utc::now())
        .unwrap();

        assert_eq!(c.city, None);
        assert_eq!(c.branch.as_deref(), Some("Cairo"));
        assert_eq!(c.customer_type, CustomerType::Corporate);
    }

    #[test]
    fn patch_cannot_blank_required_fields() {
        let mut c = input().into_customer(None, Utc::now()).unwrap();
        let err = CustomerPatch {
            telephone: Some(" ".into()),
            ..CustomerPatch::default()
        }
        .apply(&mut c, Utc::now());
        assert!(err.is_err());
        assert_eq!(c.telephone, "+20 100 000 0000");
    }
}
