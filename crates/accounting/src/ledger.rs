use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ehm_core::text::{clean, required};
use ehm_core::{choice_enum, parse_choice, DomainResult, Entity, RecordId, UserId, Violations};

choice_enum! {
    /// High-level account kind (determines normal balance side).
    pub enum LedgerType {
        Income => "income",
        Expense => "expense",
        Asset => "asset",
        Liability => "liability",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSide {
    Debit,
    Credit,
}

impl LedgerType {
    pub fn normal_side(self) -> BalanceSide {
        match self {
            LedgerType::Asset | LedgerType::Expense => BalanceSide::Debit,
            LedgerType::Income | LedgerType::Liability => BalanceSide::Credit,
        }
    }
}

/// Chart-of-accounts entry. `code` is unique across ledgers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAccount {
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LedgerType,
    pub code: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for LedgerAccount {
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
pub struct NewLedgerAccount {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl NewLedgerAccount {
    pub fn into_account(self, created_by: Option<UserId>, now: DateTime<Utc>) -> DomainResult<LedgerAccount> {
        let mut v = Violations::new();
        v.require("name", self.name.as_deref(), "Ledger name is required");
        if self.kind.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            v.push("type", "Ledger type is required");
        }
        let kind = parse_choice::<LedgerType>(&mut v, "type", self.kind.as_deref(), &LedgerType::allowed());
        v.require("code", self.code.as_deref(), "Ledger code is required");
        v.into_result()?;

        Ok(LedgerAccount {
            id: RecordId::new(),
            name: required(self.name),
            kind: kind.unwrap_or(LedgerType::Asset),
            code: required(self.code),
            description: clean(self.description),
            is_active: self.is_active.unwrap_or(true),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl LedgerPatch {
    pub fn apply(self, account: &mut LedgerAccount, now: DateTime<Utc>) -> DomainResult<()> {
        let mut v = Violations::new();
        if self.name.is_some() {
            v.require("name", self.name.as_deref(), "Ledger name cannot be empty");
        }
        if self.code.is_some() {
            v.require("code", self.code.as_deref(), "Ledger code cannot be empty");
        }
        let kind = parse_choice::<LedgerType>(&mut v, "type", self.kind.as_deref(), &LedgerType::allowed());
        v.into_result()?;

        if let Some(name) = clean(self.name) {
            account.name = name;
        }
        if let Some(code) = clean(self.code) {
            account.code = code;
        }
        if let Some(kind) = kind {
            account.kind = kind;
        }
        if self.description.is_some() {
            account.description = clean(self.description);
        }
        if let Some(active) = self.is_active {
            account.is_active = active;
        }
        account.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash() -> LedgerAccount {
        NewLedgerAccount {
            name: Some("Cash".into()),
            kind: Some("asset".into()),
            code: Some(" 1000 ".into()),
            ..NewLedgerAccount::default()
        }
        .into_account(None, Utc::now())
        .unwrap()
    }

    #[test]
    fn create_trims_code_and_defaults_active() {
        let account = cash();
        assert_eq!(account.code, "1000");
        assert!(account.is_active);
        assert_eq!(account.kind.normal_side(), BalanceSide::Debit);
    }

    #[test]
    fn type_is_required_and_checked() {
        let missing = NewLedgerAccount {
            name: Some("Sales".into()),
            code: Some("4000".into()),
            ..NewLedgerAccount::default()
        };
        assert!(missing.into_account(None, Utc::now()).is_err());

        let wrong = NewLedgerAccount {
            name: Some("Sales".into()),
            code: Some("4000".into()),
            kind: Some("revenue".into()),
            ..NewLedgerAccount::default()
        };
        assert!(wrong.into_account(None, Utc::now()).is_err());
    }

    #[test]
    fn income_and_liability_are_credit_side() {
        assert_eq!(LedgerType::Income.normal_side(), BalanceSide::Credit);
        assert_eq!(LedgerType::Liability.normal_side(), BalanceSide::Credit);
    }

    #[test]
    fn serializes_kind_as_type() {
        let json = serde_json::to_value(cash()).unwrap();
        assert_eq!(json["type"], "asset");
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn patch_deactivates() {
        let mut account = cash();
        LedgerPatch {
            is_active: Some(false),
            ..LedgerPatch::default()
        }
        .apply(&mut account, Utc::now())
        .unwrap();
        assert!(!account.is_active);
        assert_eq!(account.code, "1000");
    }
}
