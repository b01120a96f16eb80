use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ehm_core::{CodePrefix, RecordId, UserId};
use ehm_infra::find_duplicate;
use ehm_infra::spreadsheet::{self, SupplierRow};
use ehm_infra::store::{search_fields, GroupKey, Page, RecordFilter};
use ehm_parties::{NewSupplier, Supplier, SupplierPatch};

use super::{by_count, AppServices, CountRow};
use crate::app::dto::{present, PageParams, Pagination};
use crate::app::errors::{Resource, ServiceError};

const SEARCH_FIELDS: &[&str] = &["supplierName", "email", "telephone", "supplierCode"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    pub supplier_type: Option<String>,
    pub country: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierStats {
    pub total_suppliers: u64,
    pub suppliers_by_type: Vec<CountRow>,
    pub suppliers_by_country: Vec<CountRow>,
}

/// Outcome of a workbook import; failed rows are reported, not fatal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: Vec<String>,
}

fn row_failure(err: &ServiceError) -> String {
    match err {
        ServiceError::Validation(fields) => fields
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        ServiceError::Server { action, .. } => format!("Server error while {action}"),
        other => other.to_string(),
    }
}

impl AppServices {
    pub async fn list_suppliers(
        &self,
        q: &SupplierQuery,
    ) -> Result<(Vec<Supplier>, Pagination), ServiceError> {
        let mut filter = RecordFilter::new()
            .eq_opt("supplierType", present(&q.supplier_type))
            .contains("country", present(&q.country))
            .contains("branch", present(&q.branch));
        if let Some(needle) = present(&q.search) {
            filter = filter.any_of(search_fields(SEARCH_FIELDS, needle));
        }

        let paging = PageParams {
            page: q.page,
            limit: q.limit,
        };
        let err = || ServiceError::store(Resource::Supplier, "fetching suppliers");
        let total = self.suppliers.count(&filter).await.map_err(err())?;
        let items = self
            .suppliers
            .find(&filter, paging.window())
            .await
            .map_err(err())?;
        Ok((items, Pagination::new(&paging, total)))
    }

    pub async fn get_supplier(&self, id: RecordId) -> Result<Supplier, ServiceError> {
        self.suppliers
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Supplier, "fetching supplier"))?
            .ok_or(ServiceError::NotFound(Resource::Supplier))
    }

    /// Validate, reject duplicate contacts, then allocate a `SUP` code.
    ///
    /// A failed code allocation aborts the creation.
    pub async fn create_supplier(
        &self,
        input: NewSupplier,
        actor: Option<UserId>,
    ) -> Result<Supplier, ServiceError> {
        input.validate()?;
        let err = || ServiceError::store(Resource::Supplier, "creating supplier");

        if let Some(key) = find_duplicate(self.suppliers.as_ref(), &input.contact_keys(), None)
            .await
            .map_err(err())?
        {
            return Err(ServiceError::Conflict(Resource::Supplier.duplicate_message(key)));
        }

        let code = self
            .codes
            .next_code(CodePrefix::Supplier)
            .await
            .map_err(err())?;
        let supplier = input.into_supplier(code, actor, Utc::now())?;
        let supplier = self.suppliers.insert(supplier).await.map_err(err())?;
        info!(supplier_code = %supplier.supplier_code, "supplier created");
        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        id: RecordId,
        patch: SupplierPatch,
    ) -> Result<Supplier, ServiceError> {
        let err = || ServiceError::store(Resource::Supplier, "updating supplier");
        let mut supplier = self
            .suppliers
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::Supplier))?;

        let before = supplier.contact_keys();
        patch.apply(&mut supplier, Utc::now())?;
        let after = supplier.contact_keys();
        if after != before {
            if let Some(key) = find_duplicate(self.suppliers.as_ref(), &after, Some(id.into()))
                .await
                .map_err(err())?
            {
                return Err(ServiceError::Conflict(Resource::Supplier.duplicate_message(key)));
            }
        }

        self.suppliers.update(supplier).await.map_err(err())
    }

    pub async fn delete_supplier(&self, id: RecordId) -> Result<(), ServiceError> {
        let removed = self
            .suppliers
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::Supplier, "deleting supplier"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::Supplier));
        }
        info!(supplier_id = %id, "supplier deleted");
        Ok(())
    }

    /// Every supplier, newest first, as an `.xlsx` workbook.
    pub async fn export_suppliers(&self) -> Result<Vec<u8>, ServiceError> {
        let suppliers = self
            .suppliers
            .find(&RecordFilter::new(), Page::all())
            .await
            .map_err(ServiceError::store(Resource::Supplier, "exporting suppliers"))?;
        spreadsheet::write_suppliers(&suppliers)
            .map_err(|e| ServiceError::server("exporting suppliers", e))
    }

    /// Create one supplier per workbook row. Each row goes through
    /// [`AppServices::create_supplier`], so codes and duplicate checks apply.
    pub async fn import_suppliers(
        &self,
        workbook: &[u8],
        actor: Option<UserId>,
    ) -> Result<ImportSummary, ServiceError> {
        let rows = spreadsheet::read_suppliers(workbook).map_err(|e| {
            warn!(error = %e, "rejected supplier workbook");
            ServiceError::BadRequest("Invalid Excel file".to_string())
        })?;

        let mut summary = ImportSummary::default();
        for row in rows {
            if !row.is_complete() {
                summary
                    .errors
                    .push(format!("Row {}: Missing required fields", row.row));
                continue;
            }
            let SupplierRow { row, supplier } = row;
            match self.create_supplier(supplier, actor).await {
                Ok(_) => summary.imported += 1,
                Err(err) => summary.errors.push(format!("Row {row}: {}", row_failure(&err))),
            }
        }
        info!(
            imported = summary.imported,
            failed = summary.errors.len(),
            "supplier workbook imported"
        );
        Ok(summary)
    }

    pub async fn supplier_stats(&self) -> Result<SupplierStats, ServiceError> {
        let err = || ServiceError::store(Resource::Supplier, "fetching supplier statistics");
        let all = RecordFilter::new();
        Ok(SupplierStats {
            total_suppliers: self.suppliers.count(&all).await.map_err(err())?,
            suppliers_by_type: by_count(
                self.suppliers
                    .group(&all, GroupKey::Field("supplierType".into()), None)
                    .await
                    .map_err(err())?,
                None,
            ),
            suppliers_by_country: by_count(
                self.suppliers
                    .group(&all, GroupKey::Field("country".into()), None)
                    .await
                    .map_err(err())?,
                Some(10),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ehm_infra::{CodeAllocator, SequenceStore, StoreError};

    use super::*;

    fn input(name: &str, email: &str, phone: &str) -> NewSupplier {
        NewSupplier {
            supplier_name: Some(name.into()),
            supplier_type: Some("Hotel".into()),
            telephone: Some(phone.into()),
            email: Some(email.into()),
            country: Some("Egypt".into()),
            city: Some("Cairo".into()),
            branch: Some("Head Office".into()),
            ..NewSupplier::default()
        }
    }

    struct DownSequence;

    #[async_trait]
    impl SequenceStore for DownSequence {
        async fn next_value(&self, _name: &str) -> Result<u64, StoreError> {
            Err(StoreError::Backend("sequence table unavailable".into()))
        }
    }

    #[tokio::test]
    async fn codes_are_sequential() {
        let svc = AppServices::in_memory();
        let mut codes = Vec::new();
        for i in 0..3 {
            let s = svc
                .create_supplier(input(&format!("S{i}"), &format!("s{i}@x.com"), &format!("{i}")), None)
                .await
                .unwrap();
            codes.push(s.supplier_code);
        }
        assert_eq!(codes, vec!["SUP000001", "SUP000002", "SUP000003"]);
    }

    #[tokio::test]
    async fn allocation_failure_aborts_creation() {
        let mut svc = AppServices::in_memory();
        svc.codes = CodeAllocator::new(Arc::new(DownSequence));

        let err = svc.create_supplier(input("S", "s@x.com", "1"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Server { .. }));
        assert_eq!(svc.suppliers.count(&RecordFilter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_is_checked_before_a_code_is_spent() {
        let svc = AppServices::in_memory();
        svc.create_supplier(input("A", "a@x.com", "1"), None).await.unwrap();
        assert!(matches!(
            svc.create_supplier(input("B", "A@x.com", "2"), None).await,
            Err(ServiceError::Conflict(_))
        ));
        let next = svc.create_supplier(input("C", "c@x.com", "3"), None).await.unwrap();
        assert_eq!(next.supplier_code, "SUP000002");
    }

    #[tokio::test]
    async fn invalid_input_reports_fields() {
        let svc = AppServices::in_memory();
        let err = svc.create_supplier(NewSupplier::default(), None).await.unwrap_err();
        let ServiceError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0].message, "Supplier name is required");
    }

    #[tokio::test]
    async fn stats_group_by_type() {
        let svc = AppServices::in_memory();
        svc.create_supplier(input("A", "a@x.com", "1"), None).await.unwrap();
        let mut visa = input("B", "b@x.com", "2");
        visa.supplier_type = Some("Visa".into());
        svc.create_supplier(visa, None).await.unwrap();
        svc.create_supplier(input("C", "c@x.com", "3"), None).await.unwrap();

        let stats = svc.supplier_stats().await.unwrap();
        assert_eq!(stats.total_suppliers, 3);
        assert_eq!(stats.suppliers_by_type[0].key.as_deref(), Some("Hotel"));
        assert_eq!(stats.suppliers_by_type[0].count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_get_distinct_codes() {
        let svc = Arc::new(AppServices::in_memory());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.create_supplier(input(&format!("S{i}"), &format!("s{i}@x.com"), &format!("0{i}")), None)
                        .await
                })
            })
            .collect();

        let mut codes = Vec::new();
        for h in handles {
            codes.push(h.await.unwrap().unwrap().supplier_code);
        }
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 16);

        let stored = svc.suppliers.find(&RecordFilter::new(), Page::all()).await.unwrap();
        let mut persisted: Vec<_> = stored.into_iter().map(|s| s.supplier_code).collect();
        persisted.sort();
        assert_eq!(persisted, codes);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_email_race_has_one_winner() {
        let svc = Arc::new(AppServices::in_memory());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.create_supplier(input(&format!("S{i}"), "race@x.com", &format!("0{i}")), None)
                        .await
                })
            })
            .collect();

        let (mut ok, mut conflicts) = (0, 0);
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(ServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((ok, conflicts), (1, 15));
        assert_eq!(svc.suppliers.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn exported_workbook_imports_into_a_fresh_portal() {
        let source = AppServices::in_memory();
        source.create_supplier(input("A", "a@x.com", "1"), None).await.unwrap();
        source.create_supplier(input("B", "b@x.com", "2"), None).await.unwrap();
        let workbook = source.export_suppliers().await.unwrap();

        let target = AppServices::in_memory();
        target.create_supplier(input("Z", "z@x.com", "9"), None).await.unwrap();
        let summary = target.import_suppliers(&workbook, None).await.unwrap();

        assert_eq!(summary.imported, 2);
        assert!(summary.errors.is_empty());
        let stored = target.suppliers.find(&RecordFilter::new(), Page::all()).await.unwrap();
        let mut codes: Vec<_> = stored.iter().map(|s| s.supplier_code.as_str()).collect();
        codes.sort();
        assert_eq!(codes, vec!["SUP000001", "SUP000002", "SUP000003"]);
    }

    #[tokio::test]
    async fn bad_rows_are_reported_and_skipped() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        let header = ["Supplier Code", "Supplier Name", "Supplier Type", "Telephone", "Email", "Country", "City", "Branch"];
        let rows = [
            ["", "Nile Star", "Hotel", "0100", "nile@x.com", "Egypt", "Luxor", "Head Office"],
            ["", "No Phone", "Hotel", "", "np@x.com", "Egypt", "Aswan", "Head Office"],
            ["", "Copycat", "Hotel", "0101", "NILE@x.com", "Egypt", "Cairo", "Head Office"],
            ["", "Odd Type", "Spaceship", "0102", "odd@x.com", "Egypt", "Cairo", "Head Office"],
        ];
        for (r, cells) in (0u32..).zip(std::iter::once(header).chain(rows)) {
            for (c, v) in (0u16..).zip(cells) {
                if !v.is_empty() {
                    sheet.write_string(r, c, v).unwrap();
                }
            }
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let svc = AppServices::in_memory();
        let summary = svc.import_suppliers(&bytes, None).await.unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.errors.len(), 3);
        assert_eq!(summary.errors[0], "Row 3: Missing required fields");
        assert_eq!(
            summary.errors[1],
            "Row 4: Supplier with this email or telephone already exists"
        );
        assert_eq!(summary.errors[2], "Row 5: Invalid supplier type");
        assert_eq!(svc.suppliers.count(&RecordFilter::new()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unreadable_workbook_is_a_bad_request() {
        let svc = AppServices::in_memory();
        let err = svc.import_suppliers(b"plain text", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(ref m) if m == "Invalid Excel file"));
    }
}
