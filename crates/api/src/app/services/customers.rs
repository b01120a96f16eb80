use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use ehm_core::{Entity, RecordId, UserId};
use ehm_infra::find_duplicate;
use ehm_infra::store::{search_fields, GroupKey, Page, RecordFilter};
use ehm_parties::{Customer, CustomerPatch, CustomerType, NewCustomer};

use super::{by_count, date_range, AppServices, CountRow};
use crate::app::dto::{present, PageParams, Pagination};
use crate::app::errors::{Resource, ServiceError};

const SEARCH_FIELDS: &[&str] = &["customerName", "email", "telephone", "nationalId", "passportNumber"];
pub const ADVANCED_SEARCH_CAP: u64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub customer_type: Option<String>,
    pub country: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedCustomerQuery {
    pub customer_name: Option<String>,
    pub customer_type: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub branch: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub national_id: Option<String>,
    pub passport_number: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_customers: u64,
    pub individual_customers: u64,
    pub corporate_customers: u64,
    pub customers_by_country: Vec<CountRow>,
    pub customers_by_branch: Vec<CountRow>,
}

impl AppServices {
    pub async fn list_customers(
        &self,
        q: &CustomerQuery,
    ) -> Result<(Vec<Customer>, Pagination), ServiceError> {
        let mut filter = RecordFilter::new()
            .eq_opt("customerType", present(&q.customer_type))
            .contains("country", present(&q.country))
            .contains("branch", present(&q.branch));
        if let Some(needle) = present(&q.search) {
            filter = filter.any_of(search_fields(SEARCH_FIELDS, needle));
        }

        let paging = PageParams {
            page: q.page,
            limit: q.limit,
        };
        let err = || ServiceError::store(Resource::Customer, "fetching customers");
        let total = self.customers.count(&filter).await.map_err(err())?;
        let items = self
            .customers
            .find(&filter, paging.window())
            .await
            .map_err(err())?;
        Ok((items, Pagination::new(&paging, total)))
    }

    pub async fn get_customer(&self, id: RecordId) -> Result<Customer, ServiceError> {
        self.customers
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Customer, "fetching customer"))?
            .ok_or(ServiceError::NotFound(Resource::Customer))
    }

    pub async fn create_customer(
        &self,
        input: NewCustomer,
        actor: Option<UserId>,
    ) -> Result<Customer, ServiceError> {
        let customer = input.into_customer(actor, Utc::now())?;
        let err = || ServiceError::store(Resource::Customer, "creating customer");

        if let Some(key) = find_duplicate(self.customers.as_ref(), &customer.contact_keys(), None)
            .await
            .map_err(err())?
        {
            return Err(ServiceError::Conflict(Resource::Customer.duplicate_message(key)));
        }

        let customer = self.customers.insert(customer).await.map_err(err())?;
        info!(customer_id = %customer.id(), "customer created");
        Ok(customer)
    }

    pub async fn update_customer(
        &self,
        id: RecordId,
        patch: CustomerPatch,
    ) -> Result<Customer, ServiceError> {
        let err = || ServiceError::store(Resource::Customer, "updating customer");
        let mut customer = self
            .customers
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::Customer))?;

        let before = customer.contact_keys();
        patch.apply(&mut customer, Utc::now())?;
        let after = customer.contact_keys();
        if after != before {
            if let Some(key) = find_duplicate(self.customers.as_ref(), &after, Some(id.into()))
                .await
                .map_err(err())?
            {
                return Err(ServiceError::Conflict(Resource::Customer.duplicate_message(key)));
            }
        }

        self.customers.update(customer).await.map_err(err())
    }

    pub async fn delete_customer(&self, id: RecordId) -> Result<(), ServiceError> {
        let removed = self
            .customers
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::Customer, "deleting customer"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::Customer));
        }
        info!(customer_id = %id, "customer deleted");
        Ok(())
    }

    pub async fn customer_stats(&self) -> Result<CustomerStats, ServiceError> {
        let err = || ServiceError::store(Resource::Customer, "fetching customer statistics");
        let all = RecordFilter::new();
        let count_type = |kind: CustomerType| RecordFilter::new().eq("customerType", kind.as_str());

        Ok(CustomerStats {
            total_customers: self.customers.count(&all).await.map_err(err())?,
            individual_customers: self
                .customers
                .count(&count_type(CustomerType::Individual))
                .await
                .map_err(err())?,
            corporate_customers: self
                .customers
                .count(&count_type(CustomerType::Corporate))
                .await
                .map_err(err())?,
            customers_by_country: by_count(
                self.customers
                    .group(&all, GroupKey::Field("country".into()), None)
                    .await
                    .map_err(err())?,
                Some(10),
            ),
            customers_by_branch: by_count(
                self.customers
                    .group(&all, GroupKey::Field("branch".into()), None)
                    .await
                    .map_err(err())?,
                None,
            ),
        })
    }

    /// Field-by-field search, newest first, capped at [`ADVANCED_SEARCH_CAP`].
    pub async fn advanced_customer_search(
        &self,
        q: &AdvancedCustomerQuery,
    ) -> Result<Vec<Customer>, ServiceError> {
        let (from, to) = date_range(
            ("dateFrom", present(&q.date_from)),
            ("dateTo", present(&q.date_to)),
        )?;
        let filter = RecordFilter::new()
            .contains("customerName", present(&q.customer_name))
            .eq_opt("customerType", present(&q.customer_type))
            .contains("country", present(&q.country))
            .contains("city", present(&q.city))
            .contains("branch", present(&q.branch))
            .contains("email", present(&q.email))
            .contains("telephone", present(&q.telephone))
            .contains("nationalId", present(&q.national_id))
            .contains("passportNumber", present(&q.passport_number))
            .created_between(from, to);

        self.customers
            .find(&filter, Page::first(ADVANCED_SEARCH_CAP))
            .await
            .map_err(ServiceError::store(Resource::Customer, "performing advanced search"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: &str, phone: &str) -> NewCustomer {
        NewCustomer {
            customer_name: Some(name.into()),
            telephone: Some(phone.into()),
            email: Some(email.into()),
            country: Some("Egypt".into()),
            ..NewCustomer::default()
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let svc = AppServices::in_memory();
        svc.create_customer(input("A", "a@x.com", "1"), None).await.unwrap();

        let err = svc
            .create_customer(input("B", "A@X.COM", "2"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict(m) if m == "Customer with this email or telephone already exists"
        ));
        assert_eq!(svc.customers.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected_and_blank_email_never_matches() {
        let svc = AppServices::in_memory();
        svc.create_customer(input("A", "", "0100"), None).await.unwrap();
        svc.create_customer(input("B", " ", "0200"), None).await.unwrap();

        assert!(svc.create_customer(input("C", "c@x.com", " 0100 "), None).await.is_err());
    }

    #[tokio::test]
    async fn update_cannot_steal_another_customers_phone() {
        let svc = AppServices::in_memory();
        svc.create_customer(input("A", "a@x.com", "1"), None).await.unwrap();
        let b = svc.create_customer(input("B", "b@x.com", "2"), None).await.unwrap();

        let patch = CustomerPatch {
            telephone: Some("1".into()),
            ..CustomerPatch::default()
        };
        assert!(matches!(
            svc.update_customer(b.id, patch).await,
            Err(ServiceError::Conflict(_))
        ));

        let patch = CustomerPatch {
            notes: Some("vip".into()),
            ..CustomerPatch::default()
        };
        let updated = svc.update_customer(b.id, patch).await.unwrap();
        assert_eq!(updated.notes.as_deref(), Some("vip"));
    }

    #[tokio::test]
    async fn list_searches_and_paginates() {
        let svc = AppServices::in_memory();
        for i in 0..12 {
            svc.create_customer(input(&format!("Guest {i}"), &format!("g{i}@x.com"), &format!("{i}")), None)
                .await
                .unwrap();
        }
        svc.create_customer(input("Nour", "nour@x.com", "99"), None).await.unwrap();

        let (items, page) = svc.list_customers(&CustomerQuery::default()).await.unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(page.total, 13);
        assert_eq!(page.total_pages, 2);
        assert_eq!(items[0].customer_name, "Nour");

        let q = CustomerQuery {
            search: Some("NOUR".into()),
            ..CustomerQuery::default()
        };
        let (items, page) = svc.list_customers(&q).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(items[0].email.as_deref(), Some("nour@x.com"));
    }

    #[tokio::test]
    async fn stats_break_down_by_type_and_country() {
        let svc = AppServices::in_memory();
        svc.create_customer(input("A", "a@x.com", "1"), None).await.unwrap();
        let mut corp = input("B", "b@x.com", "2");
        corp.customer_type = Some("Corporate".into());
        corp.country = Some("France".into());
        svc.create_customer(corp, None).await.unwrap();
        svc.create_customer(input("C", "c@x.com", "3"), None).await.unwrap();

        let stats = svc.customer_stats().await.unwrap();
        assert_eq!(stats.total_customers, 3);
        assert_eq!(stats.individual_customers, 2);
        assert_eq!(stats.corporate_customers, 1);
        assert_eq!(stats.customers_by_country[0].key.as_deref(), Some("Egypt"));
        assert_eq!(stats.customers_by_country[0].count, 2);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let svc = AppServices::in_memory();
        assert!(matches!(
            svc.delete_customer(RecordId::new()).await,
            Err(ServiceError::NotFound(Resource::Customer))
        ));
    }
}
