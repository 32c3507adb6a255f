pub mod claimdtos;
pub mod referraldtos;
pub mod settingsdtos;
pub mod webhookdtos;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub message: String,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Response {
            success: true,
            message: message.into(),
        }
    }
}
