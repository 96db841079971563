//! Canonical phone normalization for the client directory.
//!
//! Clients type their number every which way (with +54, with the local 15
//! prefix, bare 10 digits) and WhatsApp reports senders as `549…@c.us`.
//! Every lookup, upsert and webhook match goes through [`normalize`] so the
//! same person always maps to the same key: E.164-like digits, Argentine
//! mobiles canonicalized to the `549` form WhatsApp uses.

/// Normalize a raw phone string to comparable digits.
pub fn normalize(raw: &str) -> String {
    // WhatsApp chat ids look like "5493512345678@c.us".
    let raw = raw.split('@').next().unwrap_or(raw);
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    // Local number without country code, e.g. 3517552167.
    if digits.len() == 10 {
        return format!("549{digits}");
    }
    // Local with the mobile "15" prefix, e.g. 153517552167.
    if digits.len() == 12 && digits.starts_with("15") {
        return format!("549{}", &digits[2..]);
    }
    // Country code present but missing the mobile 9, e.g. 543517552167.
    if digits.len() == 12 && digits.starts_with("54") && !digits.starts_with("549") {
        return format!("549{}", &digits[2..]);
    }
    // Mobile 9 followed by a stray trunk 0, e.g. 54903517552167.
    if let Some(rest) = digits.strip_prefix("5490") {
        return format!("549{rest}");
    }
    digits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_formatting() {
        assert_eq!(normalize("+54 9 351 755-2167"), "5493517552167");
    }

    #[test]
    fn test_local_ten_digits_gets_country_code() {
        assert_eq!(normalize("3517552167"), "5493517552167");
    }

    #[test]
    fn test_local_with_15_prefix() {
        assert_eq!(normalize("153517552167"), "5493517552167");
    }

    #[test]
    fn test_country_code_without_mobile_nine() {
        assert_eq!(normalize("543517552167"), "5493517552167");
    }

    #[test]
    fn test_stray_trunk_zero_after_549() {
        assert_eq!(normalize("54903517552167"), "5493517552167");
    }

    #[test]
    fn test_whatsapp_chat_id_suffix() {
        assert_eq!(normalize("5493517552167@c.us"), "5493517552167");
    }

    #[test]
    fn test_already_canonical_passes_through() {
        assert_eq!(normalize("5493517552167"), "5493517552167");
    }

    #[test]
    fn test_same_client_from_every_spelling() {
        let canonical = normalize("5493517552167");
        for raw in ["3517552167", "153517552167", "+543517552167", "5493517552167@c.us"] {
            assert_eq!(normalize(raw), canonical, "{raw}");
        }
    }
}
