use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::validation::rules::{validate_attributes, validate_variant_id};

pub const DEFAULT_LINE_TITLE: &str = "Customization request";

/// Submission posted by the storefront theme.
#[derive(Debug, Clone, Default, Deserialize, Validate, PartialEq)]
pub struct CustomizationRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub product_title: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    #[validate(custom = "validate_variant_id")]
    pub variant_id: Option<String>,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 100))]
    pub quantity: u32,
    #[validate(length(min = 1, max = 5000))]
    pub details: String,
    #[serde(default)]
    #[validate(custom = "validate_attributes")]
    pub attributes: BTreeMap<String, String>,
}

fn default_quantity() -> u32 {
    1
}

/// Liquid renders `{{ variant.id }}` as a bare number; ids are kept as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Number(u64),
    }

    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::Text(text) => text,
            StringOrNumber::Number(number) => number.to_string(),
        }),
    )
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid form field '{field}'")]
pub struct FormFieldError {
    pub field: String,
}

impl CustomizationRequest {
    /// Builds a request from `application/x-www-form-urlencoded` pairs.
    /// Free-form fields arrive as `attributes[Key]=Value`; unknown keys are ignored.
    pub fn from_form_pairs(pairs: Vec<(String, String)>) -> Result<Self, FormFieldError> {
        let mut request = CustomizationRequest {
            quantity: default_quantity(),
            ..Default::default()
        };

        for (key, value) in pairs {
            match key.as_str() {
                "name" => request.name = value,
                "email" => request.email = value,
                "phone" => request.phone = Some(value),
                "product_title" => request.product_title = Some(value),
                "variant_id" => request.variant_id = Some(value),
                "details" => request.details = value,
                "quantity" => {
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        request.quantity = trimmed
                            .parse()
                            .map_err(|_| FormFieldError { field: key.clone() })?;
                    }
                }
                other => {
                    if let Some(name) = other
                        .strip_prefix("attributes[")
                        .and_then(|rest| rest.strip_suffix(']'))
                    {
                        request.attributes.insert(name.to_string(), value);
                    }
                }
            }
        }

        Ok(request)
    }

    /// Trims every string and drops blank optional values.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.details = self.details.trim().to_string();
        self.phone = non_blank(self.phone);
        self.product_title = non_blank(self.product_title);
        self.variant_id = non_blank(self.variant_id);
        self.attributes = self
            .attributes
            .into_iter()
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .collect();
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The single access token persisted after installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    pub shop: String,
    pub access_token: String,
    pub scope: String,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderInput {
    pub email: String,
    pub note: String,
    pub tags: Vec<String>,
    pub line_items: Vec<DraftOrderLineItem>,
    pub custom_attributes: Vec<AttributeInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderLineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttributeInput {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftOrder {
    pub id: String,
    pub name: String,
    #[serde(rename(deserialize = "invoiceUrl"))]
    pub invoice_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl UserError {
    pub fn describe(&self) -> String {
        match &self.field {
            Some(path) if !path.is_empty() => format!("{}: {}", path.join("."), self.message),
            _ => self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DraftOrderOutcome {
    Created(DraftOrder),
    Rejected(Vec<UserError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_request() -> CustomizationRequest {
        CustomizationRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            quantity: 1,
            details: "Engrave initials".into(),
            ..Default::default()
        }
    }

    fn attributes(count: usize, key_len: usize) -> BTreeMap<String, String> {
        (0..count)
            .map(|i| (format!("{i:0>width$}", width = key_len), "v".to_string()))
            .collect()
    }

    #[test]
    fn field_bounds_accept_max_and_reject_max_plus_one() {
        type Edit = fn(&mut CustomizationRequest);
        let cases: [(&str, Edit, Edit); 9] = [
            ("name", |r| r.name = "n".repeat(120), |r| r.name = "n".repeat(121)),
            ("name", |r| r.name = "n".into(), |r| r.name = String::new()),
            ("phone", |r| r.phone = Some("1".repeat(40)), |r| r.phone = Some("1".repeat(41))),
            (
                "product_title",
                |r| r.product_title = Some("p".repeat(255)),
                |r| r.product_title = Some("p".repeat(256)),
            ),
            ("quantity", |r| r.quantity = 100, |r| r.quantity = 101),
            ("quantity", |r| r.quantity = 1, |r| r.quantity = 0),
            ("details", |r| r.details = "d".repeat(5000), |r| r.details = "d".repeat(5001)),
            (
                "attributes",
                |r| r.attributes = attributes(20, 4),
                |r| r.attributes = attributes(21, 4),
            ),
            (
                "attributes",
                |r| r.attributes = attributes(1, 64),
                |r| r.attributes = attributes(1, 65),
            ),
        ];

        for (field, at_limit, over_limit) in cases {
            let mut accepted = valid_request();
            at_limit(&mut accepted);
            assert!(accepted.validate().is_ok(), "{field} at limit should pass");

            let mut rejected = valid_request();
            over_limit(&mut rejected);
            let errors = rejected
                .validate()
                .expect_err("over limit should fail");
            assert!(
                errors.field_errors().contains_key(field),
                "{field} over limit should be reported, got {errors:?}"
            );
        }
    }

    #[test]
    fn variant_id_accepts_json_number_or_string() {
        let numeric: CustomizationRequest = serde_json::from_value(serde_json::json!({
            "name": "Ada", "email": "ada@example.com", "details": "x", "variant_id": 4242
        }))
        .expect("numeric variant id should deserialize");
        assert_eq!(numeric.variant_id.as_deref(), Some("4242"));

        let textual: CustomizationRequest = serde_json::from_value(serde_json::json!({
            "name": "Ada", "email": "ada@example.com", "details": "x",
            "variant_id": "gid://shopify/ProductVariant/7"
        }))
        .expect("string variant id should deserialize");
        assert_eq!(
            textual.variant_id.as_deref(),
            Some("gid://shopify/ProductVariant/7")
        );

        let absent: CustomizationRequest = serde_json::from_value(serde_json::json!({
            "name": "Ada", "email": "ada@example.com", "details": "x", "variant_id": null
        }))
        .expect("null variant id should deserialize");
        assert_eq!(absent.variant_id, None);
    }

    #[test]
    fn form_pairs_map_known_fields_and_attributes() {
        let request = CustomizationRequest::from_form_pairs(pairs(&[
            ("name", "Ada"),
            ("email", "ada@example.com"),
            ("quantity", "3"),
            ("details", "Engrave initials"),
            ("attributes[Font]", "Serif"),
            ("form_type", "customization"),
        ]))
        .expect("form should parse");

        assert_eq!(request.name, "Ada");
        assert_eq!(request.quantity, 3);
        assert_eq!(request.attributes.get("Font").map(String::as_str), Some("Serif"));
        assert_eq!(request.attributes.len(), 1);
    }

    #[test]
    fn form_pairs_reject_non_numeric_quantity() {
        let error = CustomizationRequest::from_form_pairs(pairs(&[("quantity", "lots")]))
            .expect_err("quantity must be numeric");
        assert_eq!(error.field, "quantity");
    }

    #[test]
    fn normalized_drops_blank_optionals() {
        let request = CustomizationRequest {
            name: "  Ada ".into(),
            email: "ada@example.com".into(),
            phone: Some("   ".into()),
            product_title: Some(" Ring ".into()),
            details: "x".into(),
            quantity: 1,
            attributes: BTreeMap::from([("Size".into(), " ".into())]),
            ..Default::default()
        }
        .normalized();

        assert_eq!(request.name, "Ada");
        assert_eq!(request.phone, None);
        assert_eq!(request.product_title.as_deref(), Some("Ring"));
        assert!(request.attributes.is_empty());
    }

    #[test]
    fn user_error_describes_field_path() {
        let error = UserError {
            field: Some(vec!["lineItems".into(), "0".into(), "variantId".into()]),
            message: "is invalid".into(),
        };
        assert_eq!(error.describe(), "lineItems.0.variantId: is invalid");
    }
}
