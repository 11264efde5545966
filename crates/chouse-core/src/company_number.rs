//! Canonical form for UK company registration numbers.
//!
//! The registry keys every company by an 8-character number, but numbers
//! arrive from users and spreadsheets with leading zeros stripped and in
//! mixed case.
//!
//! # Numbering conventions
//!
//! - England & Wales companies: 8 digits, e.g. `01234567`
//! - Prefixed registers: two letters then 6 digits, e.g. `SC123456`
//!   (Scotland), `NI001234` (Northern Ireland), `OC301234` (LLP)

/// Two-letter register prefixes the registry issues.
const REGISTER_PREFIXES: &[&str] = &[
    "AC", "CE", "CS", "FC", "GE", "IC", "IP", "LP", "NA", "NC", "NF", "NI", "NL", "NO", "NP",
    "NZ", "OC", "PC", "RC", "RS", "SA", "SC", "SF", "SI", "SL", "SO", "SP", "SR",
];

/// Normalise a company number to the registry's 8-character form.
///
/// 1. Trim and uppercase.
/// 2. Pure digits → left-pad with zeros to 8.
/// 3. Known register prefix + digits → prefix followed by digits padded to 6.
/// 4. Anything else is returned unchanged (after step 1).
pub fn normalize_company_number(s: &str) -> String {
    let number = s.trim().to_ascii_uppercase();
    if number.is_empty() {
        return number;
    }

    if number.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{number:0>8}");
    }

    if number.len() >= 2 && number.len() < 8 && number.is_char_boundary(2) {
        let (prefix, digits) = number.split_at(2);
        if REGISTER_PREFIXES.contains(&prefix)
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
        {
            return format!("{prefix}{digits:0>6}");
        }
    }

    number
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_padded_to_eight() {
        assert_eq!(normalize_company_number("12345678"), "12345678");
        assert_eq!(normalize_company_number("1234567"), "01234567");
        assert_eq!(normalize_company_number("123456"), "00123456");
    }

    #[test]
    fn prefixed_padded_to_six_digits() {
        assert_eq!(normalize_company_number("SC123456"), "SC123456");
        assert_eq!(normalize_company_number("SC12345"), "SC012345");
        assert_eq!(normalize_company_number("NI1234"), "NI001234");
        assert_eq!(normalize_company_number("OC123456"), "OC123456");
    }

    #[test]
    fn lowercase_and_whitespace_normalised() {
        assert_eq!(normalize_company_number("  sc123456 "), "SC123456");
        assert_eq!(normalize_company_number(" 42 "), "00000042");
    }

    #[test]
    fn unknown_shapes_left_alone() {
        assert_eq!(normalize_company_number("XY12"), "XY12");
        assert_eq!(normalize_company_number("SC"), "SC");
        assert_eq!(normalize_company_number("ABCDEFGHIJ"), "ABCDEFGHIJ");
    }

    #[test]
    fn empty_string() {
        assert_eq!(normalize_company_number(""), "");
        assert_eq!(normalize_company_number("   "), "");
    }
}
