pub mod mails;
pub mod sendmail;

pub use sendmail::{MailDelivery, MailError, Mailer, ResendMailer};
