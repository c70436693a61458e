use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::{
    domain::models::{
        AttributeInput, CustomizationRequest, DraftOrder, DraftOrderInput, DraftOrderLineItem,
        DraftOrderOutcome, StoredToken, DEFAULT_LINE_TITLE,
    },
    infrastructure::{shopify::ShopifyError, state::AppState},
    validation::rules::{describe_errors, normalize_variant_id},
};

use super::errors::ServiceError;

/// Upstream detail is logged, never echoed to the storefront.
pub const UPSTREAM_FAILURE: &str = "draft order could not be created";

pub struct CustomizationService {
    pub state: Arc<AppState>,
}

impl CustomizationService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn submit(
        &self,
        token: &StoredToken,
        request: CustomizationRequest,
    ) -> Result<DraftOrder, ServiceError> {
        let request = request.normalized();
        request
            .validate()
            .map_err(|errors| ServiceError::Validation(describe_errors(&errors)))?;

        let input = build_draft_order_input(&request, &self.state.config.shopify.draft_order_tag);
        let outcome = self
            .state
            .shopify
            .create_draft_order(&token.access_token, &input)
            .await;

        match outcome {
            Ok(DraftOrderOutcome::Created(order)) => {
                info!(draft_order = %order.name, "customization request forwarded");
                Ok(order)
            }
            Ok(DraftOrderOutcome::Rejected(errors)) => {
                let message = errors
                    .iter()
                    .map(|e| e.describe())
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(%message, "draft order rejected");
                Err(ServiceError::Rejected(message))
            }
            Err(ShopifyError::Unauthorized(status)) => {
                warn!(%status, "access token rejected; clearing stored token");
                if let Err(err) = self.state.tokens.clear().await {
                    warn!(error = ?err, "failed to clear revoked access token");
                }
                Err(ServiceError::NotInstalled)
            }
            Err(err) => {
                warn!(error = %err, "draft order creation failed");
                Err(ServiceError::Upstream(UPSTREAM_FAILURE.into()))
            }
        }
    }
}

/// Maps a validated submission onto the `DraftOrderInput` GraphQL type.
pub fn build_draft_order_input(request: &CustomizationRequest, tag: &str) -> DraftOrderInput {
    let line_item = match request.variant_id.as_deref().and_then(normalize_variant_id) {
        Some(variant_id) => DraftOrderLineItem {
            variant_id: Some(variant_id),
            title: None,
            quantity: request.quantity,
            original_unit_price: None,
        },
        None => DraftOrderLineItem {
            variant_id: None,
            title: Some(
                request
                    .product_title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LINE_TITLE.to_string()),
            ),
            quantity: request.quantity,
            original_unit_price: Some("0.00".to_string()),
        },
    };

    let mut custom_attributes = vec![AttributeInput {
        key: "Name".to_string(),
        value: request.name.clone(),
    }];
    if let Some(phone) = &request.phone {
        custom_attributes.push(AttributeInput {
            key: "Phone".to_string(),
            value: phone.clone(),
        });
    }
    if let Some(product) = &request.product_title {
        custom_attributes.push(AttributeInput {
            key: "Product".to_string(),
            value: product.clone(),
        });
    }
    custom_attributes.extend(request.attributes.iter().map(|(key, value)| AttributeInput {
        key: key.clone(),
        value: value.clone(),
    }));

    DraftOrderInput {
        email: request.email.clone(),
        note: request.details.clone(),
        tags: vec![tag.to_string()],
        line_items: vec![line_item],
        custom_attributes,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn request() -> CustomizationRequest {
        CustomizationRequest {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: Some("+44 20 0000".into()),
            product_title: Some("Signet ring".into()),
            variant_id: None,
            quantity: 2,
            details: "Engrave 'AL' on the face".into(),
            attributes: BTreeMap::from([
                ("Metal".into(), "Gold".into()),
                ("Finger size".into(), "7".into()),
            ]),
        }
    }

    #[test]
    fn custom_line_item_uses_product_title_and_zero_price() {
        let input = build_draft_order_input(&request(), "customization-request");
        let value = serde_json::to_value(&input).expect("serialize");

        assert_eq!(
            value["lineItems"],
            serde_json::json!([{
                "title": "Signet ring",
                "quantity": 2,
                "originalUnitPrice": "0.00"
            }])
        );
        assert_eq!(value["note"], "Engrave 'AL' on the face");
        assert_eq!(value["tags"], serde_json::json!(["customization-request"]));
    }

    #[test]
    fn variant_line_item_is_normalized_to_gid() {
        let mut req = request();
        req.variant_id = Some("123".into());
        let input = build_draft_order_input(&req, "custom");

        let value = serde_json::to_value(&input.line_items).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!([{
                "variantId": "gid://shopify/ProductVariant/123",
                "quantity": 2
            }])
        );
    }

    #[test]
    fn custom_attributes_list_contact_then_free_form_in_key_order() {
        let input = build_draft_order_input(&request(), "custom");
        let keys: Vec<&str> = input
            .custom_attributes
            .iter()
            .map(|a| a.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Name", "Phone", "Product", "Finger size", "Metal"]);
    }

    #[test]
    fn missing_product_falls_back_to_default_title() {
        let mut req = request();
        req.product_title = None;
        req.phone = None;
        let input = build_draft_order_input(&req, "custom");

        assert_eq!(input.line_items[0].title.as_deref(), Some(DEFAULT_LINE_TITLE));
        assert_eq!(input.custom_attributes.len(), 3);
    }
}
