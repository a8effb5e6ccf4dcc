//! Address resolution collaborator

use miette::Diagnostic;
use thiserror::Error;

use crate::entities::{Address, AddressStatus};

#[derive(Debug, Error, Diagnostic)]
pub enum AddressError {
    #[error("could not resolve address '{0}'")]
    #[diagnostic(
        code(doorway::address::unresolved),
        help("use `street, city, ST 12345`, or enter the address manually")
    )]
    Unresolved(String),

    #[error("address service unavailable: {0}")]
    #[diagnostic(code(doorway::address::unavailable))]
    Unavailable(String),
}

/// Turns free text into a structured address with a verification status
pub trait AddressResolver {
    fn resolve(&self, input: &str) -> Result<Address, AddressError>;
}

/// Resolver that parses US-style one-line addresses without a network call
///
/// Accepts `street[, unit], city, ST 12345[-6789]`. A parsed address is
/// reported as verified.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAddressResolver;

impl OfflineAddressResolver {
    fn parse(input: &str) -> Option<Address> {
        let parts: Vec<&str> = input
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 3 || parts.len() > 4 {
            return None;
        }

        let (state, postal_code) = parts[parts.len() - 1].split_once(char::is_whitespace)?;
        let postal_code = postal_code.trim();
        if !is_state_code(state) || !is_postal_code(postal_code) {
            return None;
        }

        let street = parts[0];
        if !street.chars().next()?.is_ascii_digit() {
            return None;
        }
        let unit = (parts.len() == 4).then(|| parts[1].to_string());
        let city = parts[parts.len() - 2];

        let mut address = Address {
            street: street.to_string(),
            unit,
            city: city.to_string(),
            state: state.to_uppercase(),
            postal_code: postal_code.to_string(),
            formatted: None,
            status: AddressStatus::Verified,
        };
        address.formatted = Some(address.composite());
        Some(address)
    }
}

fn is_state_code(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_postal_code(s: &str) -> bool {
    let (zip, plus4) = match s.split_once('-') {
        Some((zip, plus4)) => (zip, Some(plus4)),
        None => (s, None),
    };
    zip.len() == 5
        && zip.chars().all(|c| c.is_ascii_digit())
        && plus4.map_or(true, |p| p.len() == 4 && p.chars().all(|c| c.is_ascii_digit()))
}

impl AddressResolver for OfflineAddressResolver {
    fn resolve(&self, input: &str) -> Result<Address, AddressError> {
        let address =
            Self::parse(input).ok_or_else(|| AddressError::Unresolved(input.trim().to_string()))?;
        tracing::debug!(address = %address.composite(), "address resolved offline");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_one_line_address() {
        let address = OfflineAddressResolver
            .resolve(" 12 Oak St , Austin, tx 78701")
            .unwrap();
        assert_eq!(address.street, "12 Oak St");
        assert_eq!(address.city, "Austin");
        assert_eq!(address.state, "TX");
        assert_eq!(address.postal_code, "78701");
        assert_eq!(address.status, AddressStatus::Verified);
        assert_eq!(address.formatted.as_deref(), Some("12 Oak St, Austin, TX 78701"));
    }

    #[test]
    fn test_resolves_unit_and_zip_plus_four() {
        let address = OfflineAddressResolver
            .resolve("400 Main St, Unit 3B, Boise, ID 83702-1234")
            .unwrap();
        assert_eq!(address.unit.as_deref(), Some("Unit 3B"));
        assert_eq!(address.postal_code, "83702-1234");
    }

    #[test]
    fn test_rejects_incomplete_text() {
        for input in ["12 Oak St", "Oak St, Austin, TX 78701", "12 Oak St, Austin, Texas 78701", "12 Oak St, Austin, TX 787"] {
            assert!(
                matches!(
                    OfflineAddressResolver.resolve(input),
                    Err(AddressError::Unresolved(_))
                ),
                "{input}"
            );
        }
    }
}
