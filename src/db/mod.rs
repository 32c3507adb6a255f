pub mod db;
pub mod orderdb;
pub mod redemptiondb;
pub mod referraldb;
pub mod settingsdb;

pub use orderdb::ProcessedOrderExt;
pub use redemptiondb::RedemptionExt;
pub use referraldb::ReferralExt;
pub use settingsdb::SettingsExt;
