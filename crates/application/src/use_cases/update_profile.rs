//! Update profile use case.

use std::sync::Arc;

use pickup_domain::{ApiRequest, PhoneNumber};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::AuthenticatedGateway;
use crate::error::GatewayResult;

/// Path of the signed-in user's profile resource.
pub const PROFILE_PATH: &str = "/users/me";

/// Input for updating the profile.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    /// New display name.
    pub name: Option<String>,
    /// New phone number, as typed by the user.
    pub phone: Option<String>,
}

/// Profile as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Phone number, digits only.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Use case for changing name and phone number.
pub struct UpdateProfile {
    gateway: Arc<AuthenticatedGateway>,
}

impl UpdateProfile {
    /// Creates a new `UpdateProfile` use case.
    #[must_use]
    pub const fn new(gateway: Arc<AuthenticatedGateway>) -> Self {
        Self { gateway }
    }

    /// Validates the input and sends the update.
    ///
    /// # Errors
    /// - Returns a validation error for a malformed phone number; nothing is sent
    /// - Returns gateway errors from the request itself
    pub async fn execute(&self, input: UpdateProfileInput) -> GatewayResult<Profile> {
        let phone = input.phone.as_deref().map(PhoneNumber::parse).transpose()?;

        let mut body = serde_json::Map::new();
        if let Some(name) = input.name {
            body.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(phone) = phone {
            body.insert("phone".to_string(), json!(phone.digits()));
        }

        self.gateway
            .send_data(ApiRequest::patch(PROFILE_PATH, body.into()))
            .await
    }
}
