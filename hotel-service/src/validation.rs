use common_http_errors::{ApiError, ApiResult};

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 9..=15;
const PIN_DIGITS: std::ops::RangeInclusive<usize> = 5..=15;

/// Accepts an optional leading `+` followed by 9 to 15 digits.
pub fn phone_number(value: &str, location: [&str; 2]) -> ApiResult<String> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if PHONE_DIGITS.contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(trimmed.to_owned())
    } else {
        Err(ApiError::unprocessable(format!(
            "invalid phone number '{trimmed}'. use 9 to 15 digits with an optional leading +"
        ))
        .with_location(location))
    }
}

pub fn pin_code(value: &str, location: [&str; 2]) -> ApiResult<()> {
    if PIN_DIGITS.contains(&value.len()) && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::unprocessable(
            "pin code should contain minimum of 5 and maximum of 15 digits",
        )
        .with_location(location))
    }
}

/// Trimmed, lowercased name; blank names are rejected.
pub fn name(value: &str, location: [&str; 2]) -> ApiResult<String> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        Err(ApiError::unprocessable(format!("{} must not be empty", location[1]))
            .with_location(location))
    } else {
        Ok(normalized)
    }
}

/// Loose shape check: one `@` with text on both sides and a dot in the domain.
pub fn email(value: &str, location: [&str; 2]) -> ApiResult<String> {
    let trimmed = value.trim().to_lowercase();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(trimmed)
    } else {
        Err(ApiError::unprocessable(format!("invalid email address '{trimmed}'"))
            .with_location(location))
    }
}

pub fn positive(value: f64, location: [&str; 2]) -> ApiResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ApiError::unprocessable(format!("{} must be greater than 0", location[1]))
            .with_location(location))
    }
}

pub fn non_negative(value: f64, location: [&str; 2]) -> ApiResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ApiError::unprocessable(format!(
            "{} must be greater than or equal to 0",
            location[1]
        ))
        .with_location(location))
    }
}
