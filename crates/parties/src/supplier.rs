use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ehm_core::contact::normalize_email;
use ehm_core::text::{clean, required};
use ehm_core::{
    choice_enum, parse_choice, ContactKeys, DomainResult, Entity, RecordId, UserId, Violations,
};

pub const DEFAULT_CURRENCY: &str = "EGP";

choice_enum! {
    pub enum SupplierType {
        Hotel => "Hotel",
        Transportation => "Transportation",
        AirTransport => "Air Transport",
        Visa => "Visa",
        Sightseeing => "Sightseeing",
        Assistant => "Assistant",
        Flight => "Flight",
        Other => "Other",
    }
}

choice_enum! {
    /// Accounting treatment flag carried on supplier invoices.
    pub enum Bju {
        Normal => "Normal",
        ErrorTest => "Error Test",
        Tax => "Tax",
        DiscountAndCollection => "Discount & Collection",
    }
}

impl Default for Bju {
    fn default() -> Self {
        Bju::Normal
    }
}

/// A supplier record. `supplier_code` is assigned once at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: RecordId,
    pub supplier_code: String,
    pub supplier_name: String,
    pub supplier_type: SupplierType,
    pub telephone: String,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub url: Option<String>,
    pub country: String,
    pub city: String,
    pub state_region: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub branch: String,
    pub currency: String,
    pub accounting_code: Option<String>,
    pub tax_number: Option<String>,
    pub licence_number: Option<String>,
    pub owner_name: Option<String>,
    pub payment_type: Option<String>,
    pub remark_for_invoice: Option<String>,
    pub bju: Bju,
    pub is_customer: bool,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Supplier {
    type Id = RecordId;

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Supplier {
    pub fn contact_keys(&self) -> ContactKeys {
        ContactKeys::new(self.email.as_deref(), Some(self.telephone.as_str()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSupplier {
    pub supplier_name: Option<String>,
    pub supplier_type: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub url: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub branch: Option<String>,
    pub currency: Option<String>,
    pub accounting_code: Option<String>,
    pub tax_number: Option<String>,
    pub licence_number: Option<String>,
    pub owner_name: Option<String>,
    pub payment_type: Option<String>,
    pub remark_for_invoice: Option<String>,
    pub bju: Option<String>,
    pub is_customer: Option<bool>,
    pub is_active: Option<bool>,
}

impl NewSupplier {
    pub fn contact_keys(&self) -> ContactKeys {
        ContactKeys::new(self.email.as_deref(), self.telephone.as_deref())
    }

    /// Field-level validation only; runs before the duplicate guard and code allocation.
    pub fn validate(&self) -> DomainResult<()> {
        self.checked().map(|_| ())
    }

    fn checked(&self) -> DomainResult<(SupplierType, Option<Bju>)> {
        let mut v = Violations::new();
        v.require("supplierName", self.supplier_name.as_deref(), "Supplier name is required");
        let supplier_type = match self.supplier_type.as_deref().map(str::trim) {
            Some(raw) => raw.parse::<SupplierType>().ok(),
            None => None,
        };
        if supplier_type.is_none() {
            v.push("supplierType", "Invalid supplier type");
        }
        v.require("telephone", self.telephone.as_deref(), "Telephone is required");
        v.require("country", self.country.as_deref(), "Country is required");
        v.require("city", self.city.as_deref(), "City is required");
        v.require("branch", self.branch.as_deref(), "Branch is required");
        let bju = parse_choice::<Bju>(&mut v, "bju", self.bju.as_deref(), &Bju::allowed());
        v.into_result()?;
        Ok((supplier_type.unwrap_or(SupplierType::Other), bju))
    }

    pub fn into_supplier(
        self,
        supplier_code: String,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Supplier> {
        let (supplier_type, bju) = self.checked()?;

        Ok(Supplier {
            id: RecordId::new(),
            supplier_code,
            supplier_name: required(self.supplier_name),
            supplier_type,
            telephone: required(self.telephone),
            email: self.email.as_deref().and_then(normalize_email),
            fax: clean(self.fax),
            url: clean(self.url),
            country: required(self.country),
            city: required(self.city),
            state_region: clean(self.state_region),
            address1: clean(self.address1),
            address2: clean(self.address2),
            zip_code: clean(self.zip_code),
            branch: required(self.branch),
            currency: clean(self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            accounting_code: clean(self.accounting_code),
            tax_number: clean(self.tax_number),
            licence_number: clean(self.licence_number),
            owner_name: clean(self.owner_name),
            payment_type: clean(self.payment_type),
            remark_for_invoice: clean(self.remark_for_invoice),
            bju: bju.unwrap_or_default(),
            is_customer: self.is_customer.unwrap_or(false),
            is_active: self.is_active.unwrap_or(true),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. There is no code field: supplier codes never change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPatch {
    pub supplier_name: Option<String>,
    pub supplier_type: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub url: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub zip_code: Option<String>,
    pub branch: Option<String>,
    pub currency: Option<String>,
    pub accounting_code: Option<String>,
    pub tax_number: Option<String>,
    pub licence_number: Option<String>,
    pub owner_name: Option<String>,
    pub payment_type: Option<String>,
    pub remark_for_invoice: Option<String>,
    pub bju: Option<String>,
    pub is_customer: Option<bool>,
    pub is_active: Option<bool>,
}

impl SupplierPatch {
    pub fn apply(self, supplier: &mut Supplier, now: DateTime<Utc>) -> DomainResult<()> {
        let mut v = Violations::new();
        for (field, value) in [
            ("supplierName", &self.supplier_name),
            ("telephone", &self.telephone),
            ("country", &self.country),
            ("city", &self.city),
            ("branch", &self.branch),
        ] {
            if value.is_some() {
                v.require(field, value.as_deref(), &format!("{field} cannot be empty"));
            }
        }
        let supplier_type = parse_choice::<SupplierType>(
            &mut v,
            "supplierType",
            self.supplier_type.as_deref(),
            &SupplierType::allowed(),
        );
        let bju = parse_choice::<Bju>(&mut v, "bju", self.bju.as_deref(), &Bju::allowed());
        v.into_result()?;

        for (slot, value) in [
            (&mut supplier.supplier_name, self.supplier_name),
            (&mut supplier.telephone, self.telephone),
            (&mut supplier.country, self.country),
            (&mut supplier.city, self.city),
            (&mut supplier.branch, self.branch),
            (&mut supplier.currency, self.currency),
        ] {
            if let Some(value) = clean(value) {
                *slot = value;
            }
        }
        if let Some(kind) = supplier_type {
            supplier.supplier_type = kind;
        }
        if let Some(bju) = bju {
            supplier.bju = bju;
        }
        if let Some(email) = self.email {
            supplier.email = normalize_email(&email);
        }
        for (slot, value) in [
            (&mut supplier.fax, self.fax),
            (&mut supplier.url, self.url),
            (&mut supplier.state_region, self.state_region),
            (&mut supplier.address1, self.address1),
            (&mut supplier.address2, self.address2),
            (&mut supplier.zip_code, self.zip_code),
            (&mut supplier.accounting_code, self.accounting_code),
            (&mut supplier.tax_number, self.tax_number),
            (&mut supplier.licence_number, self.licence_number),
            (&mut supplier.owner_name, self.owner_name),
            (&mut supplier.payment_type, self.payment_type),
            (&mut supplier.remark_for_invoice, self.remark_for_invoice),
        ] {
            if value.is_some() {
                *slot = clean(value);
            }
        }
        if let Some(flag) = self.is_customer {
            supplier.is_customer = flag;
        }
        if let Some(flag) = self.is_active {
            supplier.is_active = flag;
        }
        supplier.updated_at = now;
        Ok(())
    }
}
