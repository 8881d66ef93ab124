//! Account and company domain model.

use crate::error::{CoreError, Result};
use crate::time::Timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

static CURRENCY_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{3}$").expect("currency code pattern is valid")
});

/// Kind of bank account. Determines which fields the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "account-type-1")]
    Type1,
    #[serde(rename = "account-type-2")]
    Type2,
    #[serde(rename = "account-type-3")]
    Type3,
    #[serde(rename = "account-type-4")]
    Type4,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [Self::Type1, Self::Type2, Self::Type3, Self::Type4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type1 => "account-type-1",
            Self::Type2 => "account-type-2",
            Self::Type3 => "account-type-3",
            Self::Type4 => "account-type-4",
        }
    }

    /// Whether responses for this type expose the owning company.
    pub fn exposes_company(&self) -> bool {
        !matches!(self, Self::Type2)
    }

    /// Whether responses for this type expose the bank details.
    pub fn exposes_additional_info(&self) -> bool {
        matches!(self, Self::Type1)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::invalid_account_type(s))
    }
}

/// ISO 4217 numeric currency code, e.g. `978`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyNumericCode(String);

impl CurrencyNumericCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyNumericCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if CURRENCY_CODE_RE.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::invalid_currency_code(s))
        }
    }
}

impl TryFrom<String> for CurrencyNumericCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyNumericCode> for String {
    fn from(value: CurrencyNumericCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyNumericCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// IBAN or any other bank account number (8 to 34 characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BankAccountNumber(String);

impl BankAccountNumber {
    pub const MIN_LEN: usize = 8;
    pub const MAX_LEN: usize = 34;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BankAccountNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let len = s.chars().count();
        if (Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            Ok(Self(s.to_string()))
        } else {
            Err(CoreError::invalid_account_number(format!(
                "'{s}' must be between {} and {} characters",
                Self::MIN_LEN,
                Self::MAX_LEN
            )))
        }
    }
}

impl TryFrom<String> for BankAccountNumber {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BankAccountNumber> for String {
    fn from(value: BankAccountNumber) -> Self {
        value.0
    }
}

impl fmt::Display for BankAccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bank details stored alongside the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountInfo {
    pub bank_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created: Timestamp,
    pub modified: Timestamp,
}

/// A bank account row together with the name of its owning company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub currency: CurrencyNumericCode,
    pub account: BankAccountNumber,
    pub company_id: Uuid,
    pub company_name: String,
    #[serde(default)]
    pub additional_info: Option<BankAccountInfo>,
    #[serde(default)]
    pub archived: bool,
    pub created: Timestamp,
    pub modified: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_type_from_str() {
        assert_eq!(
            "account-type-3".parse::<AccountType>().unwrap(),
            AccountType::Type3
        );
        assert!("ACCOUNT-TYPE-3".parse::<AccountType>().is_err());
        assert!("account-type-5".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_account_type_serde_matches_as_str() {
        for t in AccountType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, json!(t.as_str()));
        }
    }

    #[test]
    fn test_account_type_exposure() {
        assert!(AccountType::Type1.exposes_additional_info());
        assert!(AccountType::Type1.exposes_company());
        assert!(!AccountType::Type2.exposes_company());
        assert!(AccountType::Type4.exposes_company());
        assert!(!AccountType::Type4.exposes_additional_info());
    }

    #[test]
    fn test_currency_code() {
        assert!("978".parse::<CurrencyNumericCode>().is_ok());
        assert!("97".parse::<CurrencyNumericCode>().is_err());
        assert!("9780".parse::<CurrencyNumericCode>().is_err());
        assert!("EUR".parse::<CurrencyNumericCode>().is_err());
        assert!(serde_json::from_value::<CurrencyNumericCode>(json!("12a")).is_err());
    }

    #[test]
    fn test_bank_account_number_bounds() {
        assert!("1234567".parse::<BankAccountNumber>().is_err());
        assert!("12345678".parse::<BankAccountNumber>().is_ok());
        assert!("A".repeat(34).parse::<BankAccountNumber>().is_ok());
        assert!("A".repeat(35).parse::<BankAccountNumber>().is_err());
    }

    #[test]
    fn test_account_json_shape() {
        let account: Account = serde_json::from_value(json!({
            "id": "6f1c44a4-9a0a-4f6e-9b8a-0a3c2f9d7f11",
            "type": "account-type-1",
            "currency": "840",
            "account": "DE89370400440532013000",
            "company_id": "0fadca55-5645-49a4-9782-44b849930bb7",
            "company_name": "Acme",
            "additional_info": {"bank_name": "Bank"},
            "created": "2024-01-01T00:00:00Z",
            "modified": "2024-01-02T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(account.account_type, AccountType::Type1);
        assert!(!account.archived);
        assert_eq!(account.additional_info.unwrap().bank_name, "Bank");
    }
}
