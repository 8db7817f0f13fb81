//! TON wallet address shape validation.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CoreError;

/// User-friendly (base64url, 48 chars) or raw (`workchain:hex64`) form.
fn address_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9_-]{48}|-?\d+:[0-9a-fA-F]{64})$").expect("valid address regex")
    })
}

/// Validate the shape of a TON address.
///
/// This is a syntactic check only; whether the address exists on chain is
/// the indexer's concern.
pub fn validate_address(address: &str) -> Result<(), CoreError> {
    if address_re().is_match(address) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'{address}' is not a valid TON address"
        )))
    }
}
