pub mod account;
pub mod error;
pub mod time;

pub use account::{
    Account, AccountType, BankAccountInfo, BankAccountNumber, Company, CurrencyNumericCode,
};
pub use error::{CoreError, Result};
pub use self::time::{Timestamp, now_utc};
