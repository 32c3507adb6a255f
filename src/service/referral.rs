use rand::{distr::Alphanumeric, Rng};

pub fn generate_referral_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

pub fn shop_referral_link(shop_domain: &str, code: &str) -> String {
    format!("https://{}?ref={}", shop_domain, code)
}

/// Prefilled WhatsApp share message for the referral email.
pub fn whatsapp_share_link(shop_domain: &str, code: &str) -> String {
    let shop_url = shop_referral_link(shop_domain, code);
    let message = format!(
        "Check out this store! Use my referral code \"{}\" to get a FREE GIFT on your order.\n\nShop: {}",
        code, shop_url
    );

    format!(
        "https://api.whatsapp.com/send?text={}",
        urlencoding::encode(&message)
    )
}
