pub mod config;
pub mod error;
pub mod fees;
pub mod interest;
pub mod types;

pub use config::NetworkConfig;
pub use error::CoreError;
pub use fees::{calculate_fee, calculate_fee_reverse, imbalance_generated};
pub use interest::{balance_with_interest, calculate_interest, SECONDS_PER_YEAR};
pub use types::{Address, Amount, FeePayer, PaymentPath, Timestamp};
