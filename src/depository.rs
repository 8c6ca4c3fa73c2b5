//! Depository normalization.
//!
//! Free-text depository values are folded onto `NSDL`, `CDSL`, `Physical` or
//! `NSDL & CDSL`. Anything unrecognised is handed back unchanged and is then
//! caught by [`is_valid_depository`], whose accepted set is one entry wider than
//! what [`normalize_depository`] can produce (`CDSL & NSDL`). Stored shares were
//! written under these exact rules, so both sets stay as they are.

pub const NSDL: &str = "NSDL";
pub const CDSL: &str = "CDSL";
pub const PHYSICAL: &str = "Physical";
pub const NSDL_AND_CDSL: &str = "NSDL & CDSL";

/// Values the normalizer produces
pub const CANONICAL_DEPOSITORIES: [&str; 4] = [NSDL, CDSL, PHYSICAL, NSDL_AND_CDSL];

/// Values the validator accepts
pub const ACCEPTED_DEPOSITORIES: [&str; 5] = [NSDL, CDSL, PHYSICAL, NSDL_AND_CDSL, "CDSL & NSDL"];

/// Map a free-text depository onto its canonical spelling
///
/// # Examples
/// ```
/// use shares_admin::depository::normalize_depository;
///
/// assert_eq!(normalize_depository(" nsdl &amp; cdsl "), "NSDL & CDSL");
/// assert_eq!(normalize_depository("Physical shares"), "Physical");
/// assert_eq!(normalize_depository("Demat"), "Demat");
/// ```
pub fn normalize_depository(raw: &str) -> String {
    let value = raw.trim().replace("&amp;", "&");
    let upper = value.to_uppercase();

    if upper.contains("NSDL") && upper.contains("CDSL") {
        NSDL_AND_CDSL.to_string()
    } else if upper == "NSDL" {
        NSDL.to_string()
    } else if upper == "CDSL" {
        CDSL.to_string()
    } else if upper.contains("PHYSICAL") {
        PHYSICAL.to_string()
    } else {
        value
    }
}

/// Whether a normalized value belongs to the accepted set
pub fn is_valid_depository(normalized: &str) -> bool {
    ACCEPTED_DEPOSITORIES.contains(&normalized)
}
