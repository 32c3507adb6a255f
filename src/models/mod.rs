pub mod referralmodel;
pub mod settingsmodel;
