use std::collections::BTreeMap;

use validator::{ValidationError, ValidationErrors};

pub const VARIANT_GID_PREFIX: &str = "gid://shopify/ProductVariant/";
pub const MAX_ATTRIBUTES: usize = 20;
pub const MAX_ATTRIBUTE_KEY_LEN: usize = 64;
pub const MAX_ATTRIBUTE_VALUE_LEN: usize = 500;

/// Accepts `<name>.myshopify.com` where name is alphanumerics and hyphens.
pub fn is_valid_shop_domain(shop: &str) -> bool {
    let Some(name) = shop.strip_suffix(".myshopify.com") else {
        return false;
    };
    !name.is_empty()
        && !name.starts_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Normalizes a numeric variant id to its GID form; GIDs pass through.
pub fn normalize_variant_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let numeric = raw.strip_prefix(VARIANT_GID_PREFIX).unwrap_or(raw);
    if numeric.is_empty() || !numeric.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{VARIANT_GID_PREFIX}{numeric}"))
}

pub fn validate_variant_id(value: &str) -> Result<(), ValidationError> {
    match normalize_variant_id(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("variant_id")),
    }
}

pub fn validate_attributes(attributes: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if attributes.len() > MAX_ATTRIBUTES {
        return Err(ValidationError::new("too_many_attributes"));
    }
    let oversized = attributes.iter().any(|(key, value)| {
        key.chars().count() > MAX_ATTRIBUTE_KEY_LEN
            || value.chars().count() > MAX_ATTRIBUTE_VALUE_LEN
    });
    if oversized {
        return Err(ValidationError::new("attribute_length"));
    }
    Ok(())
}

/// Flattens validator output to `field: code` pairs in field order.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let codes: Vec<&str> = errs.iter().map(|e| &*e.code).collect();
            format!("{field}: {}", codes.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
