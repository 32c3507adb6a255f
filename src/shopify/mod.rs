pub mod client;

pub use client::{CommerceApi, CommerceError, ShopifyAdminClient};
