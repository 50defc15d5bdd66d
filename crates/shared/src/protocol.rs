use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    domain::{Employer, ProductImage, Role, StoreId},
    error::FieldErrorMap,
};

/// Sole status discriminator for "validation error, map into field errors".
/// Every other failing status stays on the generic failure path.
pub const VALIDATION_STATUS: u16 = 400;

/// Uniform response envelope returned by every backend operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub data: Payload<T>,
    pub message: String,
}

/// The `data` field of the envelope: an entity or collection on success, a
/// field-to-message map on a validation failure, or nothing at all.
///
/// The wire gives `data` no tag, so it is interpreted by the status flags,
/// never by its shape: a success parses it as the record, a 400 parses it as
/// field errors, everything else ignores it. A payload that does not parse
/// as what the status promises degrades to `Empty` rather than failing the
/// whole envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Record(T),
    Validation(FieldErrorMap),
    Empty,
}

impl<T> Default for Payload<T> {
    fn default() -> Self {
        Payload::Empty
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApiResponse {
    success: bool,
    status_code: u16,
    #[serde(default)]
    data: Option<serde_json::Value>,
    message: String,
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ApiResponse<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawApiResponse::deserialize(deserializer)?;
        let data = match raw.data {
            None | Some(serde_json::Value::Null) => Payload::Empty,
            Some(value) if raw.success => serde_json::from_value::<T>(value)
                .map(Payload::Record)
                .unwrap_or(Payload::Empty),
            Some(value) if raw.status_code == VALIDATION_STATUS => {
                serde_json::from_value::<FieldErrorMap>(value)
                    .map(Payload::Validation)
                    .unwrap_or(Payload::Empty)
            }
            Some(_) => Payload::Empty,
        };
        Ok(Self {
            success: raw.success,
            status_code: raw.status_code,
            data,
            message: raw.message,
        })
    }
}

impl<T> Payload<T> {
    /// The entity or collection carried on a success response, if any.
    pub fn record(self) -> Option<T> {
        match self {
            Payload::Record(data) => Some(data),
            _ => None,
        }
    }

    /// The field-to-message map carried on a validation failure, if any.
    pub fn validation(self) -> Option<FieldErrorMap> {
        match self {
            Payload::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: 200,
            data: Payload::Record(data),
            message: message.into(),
        }
    }

    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: 200,
            data: Payload::Empty,
            message: message.into(),
        }
    }

    pub fn validation(errors: FieldErrorMap, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code: VALIDATION_STATUS,
            data: Payload::Validation(errors),
            message: message.into(),
        }
    }

    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            data: Payload::Empty,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        !self.success && self.status_code == VALIDATION_STATUS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployer {
    pub business_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Partial profile update; also the payload an edit response carries back.
/// Absent fields are left untouched by [`EmployerPatch::apply_to`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl EmployerPatch {
    /// Shallow merge: fields present in the patch replace the profile's,
    /// everything else survives.
    pub fn apply_to(&self, employer: &mut Employer) {
        if let Some(business_name) = &self.business_name {
            employer.business_name = business_name.clone();
        }
        if let Some(email) = &self.email {
            employer.email = email.clone();
        }
        if let Some(phone_number) = &self.phone_number {
            employer.phone_number = phone_number.clone();
        }
        if let Some(address) = &self.address {
            employer.address = Some(address.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPassword {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Role and store assignment applied to an existing employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAssignment {
    pub roles: Vec<Role>,
    pub stores: Vec<StoreId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBankAccount {
    pub account_name: String,
    pub account_number: String,
    pub bank: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub cost_price: f64,
    pub selling_price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    pub cost_price: f64,
    pub selling_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub is_listed: bool,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryUpdate {
    pub images: Vec<ProductImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
