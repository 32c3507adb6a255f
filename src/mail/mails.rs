// mail/mails.rs
use super::sendmail::{MailError, Mailer};
use crate::service::referral::{shop_referral_link, whatsapp_share_link};

/// Referral-code email sent when a customer obtains (or re-requests) a code.
pub async fn send_referral_code_email<M: Mailer + ?Sized>(
    mailer: &M,
    shop_name: &str,
    shop_domain: &str,
    to_email: &str,
    customer_name: &str,
    referral_code: &str,
) -> Result<(), MailError> {
    let subject = format!("Your Referral Code: {} - Share & Earn!", referral_code);
    let shop_link = shop_referral_link(shop_domain, referral_code);
    let whatsapp_link = whatsapp_share_link(shop_domain, referral_code);

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: #667eea; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">🎁 Your Referral Code</h1>
  </div>
  <div style="padding: 30px;">
    <p>Hi <strong>{customer_name}</strong>,</p>
    <p>Here's your referral code:</p>
    <div style="background: #f4f4f4; padding: 15px; border-radius: 5px; text-align: center; margin: 20px 0;">
      <h2 style="color: #667eea; margin: 0;">{referral_code}</h2>
    </div>
    <p><strong>Store Link:</strong></p>
    <div style="background: #e8f4fd; padding: 10px; border-radius: 5px; margin: 10px 0;">
      <a href="{shop_link}" style="color: #667eea; word-break: break-all;">{shop_link}</a>
    </div>
    <p><strong>How it works:</strong></p>
    <ul style="color: #555;">
      <li>Share this code with friends</li>
      <li>Friends get a gift on their order</li>
      <li>You get a gift when you reach milestones</li>
    </ul>
    <div style="text-align: center; margin: 25px 0;">
      <a href="{whatsapp_link}" target="_blank"
         style="display: inline-block; background: #25D366; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">
        📱 Share on WhatsApp
      </a>
    </div>
    <p style="color: #777; font-size: 14px;">Thanks,<br>{shop_name} Team</p>
  </div>
</div>"#
    );

    let text_body = format!(
        "🎁 Your Referral Code\n\nHi {customer_name},\n\nYour referral code: {referral_code}\n\nStore link: {shop_link}\n\nHow it works:\n• Share this code with friends\n• Friends get a gift on their order\n• You get a gift when you reach milestones\n\nShare on WhatsApp: {whatsapp_link}\n\nThanks,\n{shop_name} Team"
    );

    mailer
        .send(to_email, &subject, &html_body, &text_body)
        .await
        .map(|_| ())
}

/// Congratulations email when a milestone is reached; carries the claim link.
pub async fn send_milestone_email<M: Mailer + ?Sized>(
    mailer: &M,
    shop_name: &str,
    to_email: &str,
    customer_name: &str,
    milestone_count: i32,
    claim_link: &str,
) -> Result<(), MailError> {
    let subject = format!("🎉 You reached {} referrals - claim your reward!", milestone_count);

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <div style="background: #667eea; color: white; padding: 20px; text-align: center;">
    <h1 style="margin: 0;">🎉 Congratulations!</h1>
  </div>
  <div style="padding: 30px;">
    <p>Hi <strong>{customer_name}</strong>,</p>
    <p>You just reached <strong>{milestone_count} referrals</strong> and unlocked a free reward.</p>
    <div style="text-align: center; margin: 25px 0;">
      <a href="{claim_link}"
         style="display: inline-block; background: #667eea; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">
        🎁 Claim Your Reward
      </a>
    </div>
    <p style="color: #666; font-size: 14px;">
      The link is valid for 7 days and can be used once on your next order.
    </p>
    <div style="background: #e8f4fd; padding: 10px; border-radius: 5px; margin: 10px 0;">
      <a href="{claim_link}" style="color: #667eea; word-break: break-all;">{claim_link}</a>
    </div>
    <p style="color: #777; font-size: 14px;">Thanks,<br>{shop_name} Team</p>
  </div>
</div>"#
    );

    let text_body = format!(
        "🎉 Congratulations!\n\nHi {customer_name},\n\nYou just reached {milestone_count} referrals and unlocked a free reward.\n\nClaim it here (valid for 7 days, one use): {claim_link}\n\nThanks,\n{shop_name} Team"
    );

    mailer
        .send(to_email, &subject, &html_body, &text_body)
        .await
        .map(|_| ())
}

/// "Someone used your link" notification, sent on every attributed order.
pub async fn send_referral_used_email<M: Mailer + ?Sized>(
    mailer: &M,
    shop_name: &str,
    to_email: &str,
    customer_name: &str,
    new_count: i32,
) -> Result<(), MailError> {
    let subject = "Someone used your referral link!".to_string();

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #667eea;">Your referral worked 🎯</h2>
  <p>Hi <strong>{customer_name}</strong>,</p>
  <p>A friend just placed an order using your referral link. You now have
     <strong>{new_count}</strong> successful referral{plural}.</p>
  <p>Keep sharing to reach your next milestone reward.</p>
  <p style="color: #777; font-size: 14px;">Thanks,<br>{shop_name} Team</p>
</div>"#,
        plural = if new_count == 1 { "" } else { "s" }
    );

    let text_body = format!(
        "Hi {customer_name},\n\nA friend just placed an order using your referral link. You now have {new_count} successful referral(s).\n\nKeep sharing to reach your next milestone reward.\n\nThanks,\n{shop_name} Team"
    );

    mailer
        .send(to_email, &subject, &html_body, &text_body)
        .await
        .map(|_| ())
}

/// Confirmation sent after a claim token was redeemed on an order.
pub async fn send_redemption_confirmation_email<M: Mailer + ?Sized>(
    mailer: &M,
    shop_name: &str,
    to_email: &str,
    customer_name: &str,
) -> Result<(), MailError> {
    let subject = "Your reward has been redeemed 🎁".to_string();

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #667eea;">Reward redeemed</h2>
  <p>Hi <strong>{customer_name}</strong>,</p>
  <p>Your free reward was applied to your latest order. Enjoy!</p>
  <p style="color: #777; font-size: 14px;">Thanks,<br>{shop_name} Team</p>
</div>"#
    );

    let text_body = format!(
        "Hi {customer_name},\n\nYour free reward was applied to your latest order. Enjoy!\n\nThanks,\n{shop_name} Team"
    );

    mailer
        .send(to_email, &subject, &html_body, &text_body)
        .await
        .map(|_| ())
}

/// Internal notification to the program administrator.
pub async fn send_admin_notification_email<M: Mailer + ?Sized>(
    mailer: &M,
    admin_email: &str,
    subject: &str,
    detail: &str,
) -> Result<(), MailError> {
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333;">Referral program update</h2>
  <p>{detail}</p>
</div>"#
    );

    mailer
        .send(admin_email, subject, &html_body, detail)
        .await
        .map(|_| ())
}
