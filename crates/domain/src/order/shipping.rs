use storage::ShippingInfo;

use crate::error::DomainError;

/// Validates shipping details and returns a trimmed copy.
pub fn validate_shipping(info: &ShippingInfo) -> Result<ShippingInfo, DomainError> {
    let receiver_name = required("receiver name", &info.receiver_name)?;
    let receiver_phone = required("receiver phone", &info.receiver_phone)?;
    let address = required("address", &info.address)?;

    let digits = receiver_phone.strip_prefix('+').unwrap_or(receiver_phone);
    if !(5..=20).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::InvalidShippingInfo(format!(
            "receiver phone is not a phone number: {receiver_phone}"
        )));
    }

    Ok(ShippingInfo::new(receiver_name, receiver_phone, address))
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidShippingInfo(format!("{field} is required")));
    }
    Ok(trimmed)
}
