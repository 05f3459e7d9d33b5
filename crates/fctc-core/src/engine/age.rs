//! Free-form year comparison

use crate::error::FormatError;

/// Parse "4000 BCE", "500 BC", "1,200 AD", "300 CE" or "1850" into a signed year
pub fn parse_year(text: &str) -> Result<i64, FormatError> {
    let cleaned = text.trim().to_uppercase().replace(',', "");
    let invalid = || FormatError::Year(text.trim().to_string());

    let (digits, sign) = if let Some(rest) = cleaned.strip_suffix("BCE") {
        (rest, -1)
    } else if let Some(rest) = cleaned.strip_suffix("BC") {
        (rest, -1)
    } else if let Some(rest) = cleaned.strip_suffix("AD") {
        (rest, 1)
    } else if let Some(rest) = cleaned.strip_suffix("CE") {
        (rest, 1)
    } else {
        (cleaned.as_str(), 1)
    };

    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i64 = digits.parse().map_err(|_| invalid())?;
    Ok(sign * year)
}

/// `a <= b` on the signed timeline (BCE years are negative)
pub fn is_younger(a: &str, b: &str) -> Result<bool, FormatError> {
    Ok(parse_year(a)? <= parse_year(b)?)
}
