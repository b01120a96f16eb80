use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use ehm_accounting::{LedgerAccount, LedgerPatch, NewLedgerAccount};
use ehm_core::{RecordId, UserId};
use ehm_infra::store::{Page, RecordFilter};

use super::AppServices;
use crate::app::dto::present;
use crate::app::errors::{Resource, ServiceError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub active: Option<bool>,
}

impl AppServices {
    pub async fn list_ledgers(&self, q: &LedgerQuery) -> Result<Vec<LedgerAccount>, ServiceError> {
        let filter = RecordFilter::new()
            .eq_opt("type", present(&q.kind))
            .eq_opt("isActive", q.active);
        self.ledgers
            .find(&filter, Page::all())
            .await
            .map_err(ServiceError::store(Resource::Ledger, "fetching ledgers"))
    }

    pub async fn get_ledger(&self, id: RecordId) -> Result<LedgerAccount, ServiceError> {
        self.ledgers
            .get(id)
            .await
            .map_err(ServiceError::store(Resource::Ledger, "fetching ledger"))?
            .ok_or(ServiceError::NotFound(Resource::Ledger))
    }

    /// Insert a ledger account; the store rejects a `code` already in use.
    pub async fn create_ledger(
        &self,
        input: NewLedgerAccount,
        actor: Option<UserId>,
    ) -> Result<LedgerAccount, ServiceError> {
        let account = input.into_account(actor, Utc::now())?;
        let account = self
            .ledgers
            .insert(account)
            .await
            .map_err(ServiceError::store(Resource::Ledger, "creating ledger"))?;
        info!(ledger_code = %account.code, "ledger created");
        Ok(account)
    }

    pub async fn update_ledger(
        &self,
        id: RecordId,
        patch: LedgerPatch,
    ) -> Result<LedgerAccount, ServiceError> {
        let err = || ServiceError::store(Resource::Ledger, "updating ledger");
        let mut account = self
            .ledgers
            .get(id)
            .await
            .map_err(err())?
            .ok_or(ServiceError::NotFound(Resource::Ledger))?;
        patch.apply(&mut account, Utc::now())?;
        self.ledgers.update(account).await.map_err(err())
    }

    pub async fn delete_ledger(&self, id: RecordId) -> Result<(), ServiceError> {
        let removed = self
            .ledgers
            .delete(id)
            .await
            .map_err(ServiceError::store(Resource::Ledger, "deleting ledger"))?;
        if !removed {
            return Err(ServiceError::NotFound(Resource::Ledger));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(code: &str, kind: &str) -> NewLedgerAccount {
        NewLedgerAccount {
            name: Some(format!("Account {code}")),
            kind: Some(kind.into()),
            code: Some(code.into()),
            ..NewLedgerAccount::default()
        }
    }

    #[tokio::test]
    async fn duplicate_code_is_a_conflict() {
        let svc = AppServices::in_memory();
        svc.create_ledger(account("4000", "income"), None).await.unwrap();
        let err = svc.create_ledger(account("4000", "expense"), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(m) if m == "Ledger code already exists"));
    }

    #[tokio::test]
    async fn list_filters_by_type_and_activity() {
        let svc = AppServices::in_memory();
        svc.create_ledger(account("4000", "income"), None).await.unwrap();
        let expense = svc.create_ledger(account("5000", "expense"), None).await.unwrap();
        svc.create_ledger(account("5100", "expense"), None).await.unwrap();

        let patch = LedgerPatch {
            is_active: Some(false),
            ..LedgerPatch::default()
        };
        svc.update_ledger(expense.id, patch).await.unwrap();

        let q = LedgerQuery {
            kind: Some("expense".into()),
            active: Some(true),
        };
        let items = svc.list_ledgers(&q).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].code, "5100");
    }
}
