// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub port: u16,
    // Shopify Admin API
    pub shop_domain: String,
    pub shop_name: String,
    pub shopify_access_token: String,
    pub shopify_api_version: String,
    // Claim link signing
    pub claim_token_secret: String,
    // Email service
    pub resend_api_key: String,
    pub from_email: String,
    pub admin_email: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");
        let shop_domain =
            std::env::var("SHOPIFY_SHOP_DOMAIN").expect("SHOPIFY_SHOP_DOMAIN must be set");
        let shopify_access_token =
            std::env::var("SHOPIFY_ACCESS_TOKEN").expect("SHOPIFY_ACCESS_TOKEN must be set");
        let claim_token_secret =
            std::env::var("CLAIM_TOKEN_SECRET").expect("CLAIM_TOKEN_SECRET must be set");
        let resend_api_key = std::env::var("RESEND_API_KEY").expect("RESEND_API_KEY must be set");

        let shopify_api_version = std::env::var("SHOPIFY_API_VERSION")
            .unwrap_or_else(|_| "2024-01".to_string());
        let shop_name = std::env::var("SHOP_NAME").unwrap_or_else(|_| "Our Store".to_string());
        let from_email = std::env::var("FROM_EMAIL")
            .unwrap_or_else(|_| "Referly <noreply@referly.app>".to_string());
        let admin_email =
            std::env::var("ADMIN_NOTIFICATION_EMAIL").unwrap_or_else(|_| from_email.clone());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        Config {
            database_url,
            app_url,
            port,
            shop_domain,
            shop_name,
            shopify_access_token,
            shopify_api_version,
            claim_token_secret,
            resend_api_key,
            from_email,
            admin_email,
        }
    }
}
