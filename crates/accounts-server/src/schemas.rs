//! Response bodies.
//!
//! The fields exposed depend on the account type: company fields are
//! omitted for [`AccountType::Type2`], and only [`AccountType::Type1`]
//! carries `additional_info`.

use accounts_core::{Account, AccountType, BankAccountInfo, CurrencyNumericCode, Timestamp};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBase {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub currency: CurrencyNumericCode,
    pub created: Timestamp,
    pub modified: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyFields {
    pub company_id: Uuid,
    pub company_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub base: AccountBase,
    #[serde(flatten)]
    pub company: Option<CompanyFields>,
    /// `Some(None)` renders as `null`; `None` omits the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<Option<BankAccountInfo>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        let kind = account.account_type;
        Self {
            base: AccountBase {
                id: account.id,
                account_type: kind,
                currency: account.currency,
                created: account.created,
                modified: account.modified,
            },
            company: kind.exposes_company().then(|| CompanyFields {
                company_id: account.company_id,
                company_name: account.company_name,
            }),
            additional_info: kind
                .exposes_additional_info()
                .then_some(account.additional_info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use time::macros::datetime;

    fn account(kind: AccountType) -> Account {
        Account {
            id: Uuid::nil(),
            account_type: kind,
            currency: "978".parse().unwrap(),
            account: "DE89370400440532013000".parse().unwrap(),
            company_id: Uuid::nil(),
            company_name: "Acme".into(),
            additional_info: Some(BankAccountInfo {
                bank_name: "Test Bank".into(),
                beneficiary_name: None,
                beneficiary_address: None,
            }),
            archived: false,
            created: Timestamp(datetime!(2024-01-01 0:00 UTC)),
            modified: Timestamp(datetime!(2024-02-01 0:00 UTC)),
        }
    }

    fn keys(kind: AccountType) -> Vec<String> {
        let value = serde_json::to_value(AccountResponse::from(account(kind))).unwrap();
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn fields_by_account_type() {
        assert_eq!(
            keys(AccountType::Type1),
            ["additional_info", "company_id", "company_name", "created", "currency", "id", "modified", "type"]
        );
        assert_eq!(
            keys(AccountType::Type2),
            ["created", "currency", "id", "modified", "type"]
        );
        for kind in [AccountType::Type3, AccountType::Type4] {
            assert_eq!(
                keys(kind),
                ["company_id", "company_name", "created", "currency", "id", "modified", "type"]
            );
        }
    }

    #[test]
    fn type_one_body() {
        let value = serde_json::to_value(AccountResponse::from(account(AccountType::Type1))).unwrap();
        assert_eq!(value["type"], json!("account-type-1"));
        assert_eq!(value["currency"], json!("978"));
        assert_eq!(value["additional_info"]["bank_name"], json!("Test Bank"));
        assert_eq!(value["modified"], json!("2024-02-01T00:00:00Z"));
    }

    #[test]
    fn missing_additional_info_is_null_for_type_one() {
        let mut acc = account(AccountType::Type1);
        acc.additional_info = None;
        let value = serde_json::to_value(AccountResponse::from(acc)).unwrap();
        assert_eq!(value["additional_info"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("additional_info"));
    }
}
