use thiserror::Error;

use crate::{error::HttpError, mail::MailError, shopify::CommerceError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Commerce platform error: {0}")]
    Commerce(#[from] CommerceError),

    #[error("Mail delivery error: {0}")]
    Mail(#[from] MailError),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::server_error(error.to_string())
    }
}
