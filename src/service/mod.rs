pub mod attribution;
pub mod claims;
pub mod error;
pub mod referral;
pub mod rewards;
pub mod signal;
