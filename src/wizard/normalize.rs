//! Coercion of raw field values
//!
//! Drafts keep whatever the user typed (`"1,250"`, `"$350,000"`, `" 3 "`).
//! These helpers decide whether a raw value is acceptable for a field and
//! turn it into its typed form. Blank strings and nulls mean "not supplied".

use chrono::NaiveDate;
use serde_json::Value;
use std::str::FromStr;

use crate::entities::{
    FieldValues, FinancialDetails, MortgageTerms, StructuralDetails, TenantContact, Unit,
};
use crate::wizard::validation::ValidationError;

/// Structural fields collected on the structural details step
pub const STRUCTURE_FIELDS: &[&str] = &[
    "year_built",
    "square_feet",
    "lot_size_sqft",
    "bedrooms",
    "bathrooms",
    "stories",
    "foundation",
    "garage",
];

/// Financial fields collected on the financial details step
pub const FINANCIAL_FIELDS: &[&str] = &[
    "purchase_price",
    "purchase_date",
    "current_value",
    "mortgage_balance",
    "interest_rate",
    "monthly_payment",
    "loan_term_years",
];

/// Per-unit fields accepted in unit edits
pub const UNIT_FIELDS: &[&str] = &[
    "nickname",
    "square_feet",
    "bedrooms",
    "occupancy",
    "monthly_rent",
    "tenant_name",
    "tenant_email",
    "tenant_phone",
];

pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Trimmed text form of a scalar, `None` when blank
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric reading of a value: accepts `1250`, `"1,250"`, `"$350,000"`, `"6.5%"`
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .trim_end_matches('%')
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Merge user input into stored raw values
///
/// Blank input removes the key; strings are stored trimmed.
pub fn merge_values(target: &mut FieldValues, incoming: &FieldValues) {
    for (key, value) in incoming {
        if is_blank(value) {
            target.remove(key);
        } else if let Value::String(s) = value {
            target.insert(key.clone(), Value::String(s.trim().to_string()));
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}

pub fn integer(field: &str, value: &Value, min: i64, max: i64) -> Result<i64, ValidationError> {
    let n = parse_number(value)
        .ok_or_else(|| ValidationError::new(field, format!("'{}' is not a number", display(value))))?;
    if n.fract() != 0.0 {
        return Err(ValidationError::new(field, "must be a whole number"));
    }
    if n < min as f64 || n > max as f64 {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(n as i64)
}

pub fn decimal(field: &str, value: &Value, min: f64, max: f64) -> Result<f64, ValidationError> {
    let n = parse_number(value)
        .ok_or_else(|| ValidationError::new(field, format!("'{}' is not a number", display(value))))?;
    if n < min || n > max {
        return Err(ValidationError::new(
            field,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(n)
}

/// Largest accepted dollar amount
pub const MAX_DOLLARS: f64 = 10_000_000_000.0;

/// Dollar amount in cents
pub fn cents(field: &str, value: &Value) -> Result<u64, ValidationError> {
    let n = parse_number(value).ok_or_else(|| {
        ValidationError::new(field, format!("'{}' is not a dollar amount", display(value)))
    })?;
    if n < 0.0 {
        return Err(ValidationError::new(field, "cannot be negative"));
    }
    if n > MAX_DOLLARS {
        return Err(ValidationError::new(field, "cannot exceed $10,000,000,000"));
    }
    Ok((n * 100.0).round() as u64)
}

pub fn choice<T: FromStr<Err = String>>(field: &str, value: &Value) -> Result<T, ValidationError> {
    let raw = text(value).ok_or_else(|| ValidationError::missing(field))?;
    raw.parse::<T>().map_err(|reason| ValidationError::new(field, reason))
}

/// List of choices from an array or a comma-separated string, deduplicated
pub fn choice_list<T>(field: &str, value: &Value) -> Result<Vec<T>, ValidationError>
where
    T: FromStr<Err = String> + PartialEq,
{
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(other)
            .map(|s| s.split(',').map(|p| p.trim().to_string()).collect())
            .unwrap_or_default(),
    };

    let mut out = Vec::new();
    for item in raw.iter().filter(|s| !s.is_empty()) {
        let parsed = item
            .parse::<T>()
            .map_err(|reason| ValidationError::new(field, reason))?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Ok(out)
}

/// Calendar date as `YYYY-MM-DD` or `MM/DD/YYYY`
pub fn date(field: &str, value: &Value) -> Result<NaiveDate, ValidationError> {
    let raw = text(value).ok_or_else(|| ValidationError::missing(field))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&raw, "%m/%d/%Y"))
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a date (YYYY-MM-DD)", raw)))
}

fn display(value: &Value) -> String {
    text(value).unwrap_or_else(|| value.to_string())
}

/// Typed structural attributes; unknown keys and bad values are rejected
pub fn structural_details(values: &FieldValues) -> Result<StructuralDetails, ValidationError> {
    let mut details = StructuralDetails::default();
    for (key, value) in values.iter().filter(|(_, v)| !is_blank(v)) {
        let field = key.as_str();
        match field {
            "year_built" => details.year_built = Some(integer(field, value, 1600, 2100)? as u16),
            "square_feet" => {
                details.square_feet = Some(integer(field, value, 1, 1_000_000)? as u32)
            }
            "lot_size_sqft" => {
                details.lot_size_sqft = Some(integer(field, value, 0, 100_000_000)? as u32)
            }
            "bedrooms" => details.bedrooms = Some(integer(field, value, 0, 100)? as u8),
            "bathrooms" => details.bathrooms = Some(decimal(field, value, 0.0, 100.0)?),
            "stories" => details.stories = Some(integer(field, value, 1, 200)? as u8),
            "foundation" => details.foundation = Some(choice(field, value)?),
            "garage" => details.garage = Some(choice(field, value)?),
            _ => return Err(ValidationError::new(field, "is not a structural field")),
        }
    }
    Ok(details)
}

/// Typed financial attributes; unknown keys and bad values are rejected
pub fn financial_details(values: &FieldValues) -> Result<FinancialDetails, ValidationError> {
    let mut details = FinancialDetails::default();
    let mut mortgage = MortgageTerms::default();
    for (key, value) in values.iter().filter(|(_, v)| !is_blank(v)) {
        let field = key.as_str();
        match field {
            "purchase_price" => details.purchase_price_cents = Some(cents(field, value)?),
            "purchase_date" => details.purchase_date = Some(date(field, value)?),
            "current_value" => details.current_value_cents = Some(cents(field, value)?),
            "mortgage_balance" => mortgage.balance_cents = Some(cents(field, value)?),
            "interest_rate" => mortgage.interest_rate_pct = Some(decimal(field, value, 0.0, 30.0)?),
            "monthly_payment" => mortgage.monthly_payment_cents = Some(cents(field, value)?),
            "loan_term_years" => mortgage.term_years = Some(integer(field, value, 1, 50)? as u8),
            _ => return Err(ValidationError::new(field, "is not a financial field")),
        }
    }
    if !mortgage.is_empty() {
        details.mortgage = Some(mortgage);
    }
    Ok(details)
}

/// Apply raw per-unit values; blank values clear the field
pub fn apply_unit_values(unit: &mut Unit, values: &FieldValues) -> Result<(), ValidationError> {
    let prefix = format!("units[{}]", unit.number);
    let mut tenant = unit.tenant.clone().unwrap_or_default();

    for (key, value) in values {
        let field = format!("{}.{}", prefix, key);
        let blank = is_blank(value);
        match key.as_str() {
            "nickname" => unit.nickname = text(value),
            "square_feet" => {
                unit.square_feet = if blank {
                    None
                } else {
                    Some(integer(&field, value, 1, 1_000_000)? as u32)
                }
            }
            "bedrooms" => {
                unit.bedrooms = if blank {
                    None
                } else {
                    Some(integer(&field, value, 0, 100)? as u8)
                }
            }
            "occupancy" => {
                unit.occupancy = if blank {
                    None
                } else {
                    Some(choice(&field, value)?)
                }
            }
            "monthly_rent" => {
                unit.monthly_rent_cents = if blank { None } else { Some(cents(&field, value)?) }
            }
            "tenant_name" => tenant.name = text(value).unwrap_or_default(),
            "tenant_email" => {
                let email = text(value);
                if email.as_deref().is_some_and(|e| !e.contains('@')) {
                    return Err(ValidationError::new(field, "is not an email address"));
                }
                tenant.email = email;
            }
            "tenant_phone" => tenant.phone = text(value),
            _ => return Err(ValidationError::new(field, "is not a unit field")),
        }
    }

    unit.tenant = (tenant != TenantContact::default()).then_some(tenant);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{FoundationType, OccupancyStatus, RentalPlatform};
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_number_accepts_formatted_strings() {
        assert_eq!(parse_number(&json!("1,250")), Some(1250.0));
        assert_eq!(parse_number(&json!("$350,000")), Some(350_000.0));
        assert_eq!(parse_number(&json!(" 3 ")), Some(3.0));
        assert_eq!(parse_number(&json!("6.5%")), Some(6.5));
        assert_eq!(parse_number(&json!(42)), Some(42.0));
        assert_eq!(parse_number(&json!("three")), None);
        assert_eq!(parse_number(&json!(null)), None);
    }

    #[test]
    fn test_merge_values_strips_blank_and_trims() {
        let mut stored = values(&[("year_built", json!("1990")), ("stories", json!(2))]);
        merge_values(
            &mut stored,
            &values(&[("year_built", json!("  ")), ("bedrooms", json!(" 3 "))]),
        );
        assert!(!stored.contains_key("year_built"));
        assert_eq!(stored["bedrooms"], json!("3"));
        assert_eq!(stored["stories"], json!(2));
    }

    #[test]
    fn test_structural_details_coerces() {
        let details = structural_details(&values(&[
            ("square_feet", json!("1,250")),
            ("bathrooms", json!("2.5")),
            ("foundation", json!("Crawlspace")),
            ("garage", json!("")),
        ]))
        .unwrap();
        assert_eq!(details.square_feet, Some(1250));
        assert_eq!(details.bathrooms, Some(2.5));
        assert_eq!(details.foundation, Some(FoundationType::Crawlspace));
        assert_eq!(details.garage, None);
    }

    #[test]
    fn test_structural_details_rejects_bad_values() {
        let err = structural_details(&values(&[("bedrooms", json!("2.5"))])).unwrap_err();
        assert_eq!(err.field, "bedrooms");

        let err = structural_details(&values(&[("year_built", json!("soon"))])).unwrap_err();
        assert_eq!(err.field, "year_built");

        let err = structural_details(&values(&[("pool", json!("yes"))])).unwrap_err();
        assert_eq!(err.reason, "is not a structural field");
    }

    #[test]
    fn test_financial_details_money_and_mortgage() {
        let details = financial_details(&values(&[
            ("purchase_price", json!("$350,000")),
            ("purchase_date", json!("06/15/2019")),
            ("interest_rate", json!("6.25%")),
        ]))
        .unwrap();
        assert_eq!(details.purchase_price_cents, Some(35_000_000));
        assert_eq!(
            details.purchase_date,
            NaiveDate::from_ymd_opt(2019, 6, 15)
        );
        assert_eq!(details.mortgage.unwrap().interest_rate_pct, Some(6.25));

        let empty = financial_details(&FieldValues::new()).unwrap();
        assert!(empty.mortgage.is_none());
    }

    #[test]
    fn test_cents_rounds_and_rejects_negative() {
        assert_eq!(cents("rent", &json!("1,450.50")).unwrap(), 145_050);
        assert!(cents("rent", &json!(-5)).is_err());
        assert_eq!(
            cents("rent", &json!("$10,000,000,000")).unwrap(),
            1_000_000_000_000
        );
        let err = cents("purchase_price", &json!("1e30")).unwrap_err();
        assert_eq!(err.field, "purchase_price");
        assert!(cents("rent", &json!(10_000_000_000.01)).is_err());
    }

    #[test]
    fn test_choice_list_dedupes() {
        let platforms: Vec<RentalPlatform> =
            choice_list("platforms", &json!("airbnb, Vrbo, airbnb")).unwrap();
        assert_eq!(platforms, vec![RentalPlatform::Airbnb, RentalPlatform::Vrbo]);

        let from_array: Vec<RentalPlatform> =
            choice_list("platforms", &json!(["direct"])).unwrap();
        assert_eq!(from_array, vec![RentalPlatform::Direct]);
    }

    #[test]
    fn test_apply_unit_values() {
        let mut unit = Unit::new(2);
        apply_unit_values(
            &mut unit,
            &values(&[
                ("occupancy", json!("tenant occupied")),
                ("monthly_rent", json!("$1,200")),
                ("tenant_name", json!(" Ada ")),
            ]),
        )
        .unwrap();
        assert_eq!(unit.occupancy, Some(OccupancyStatus::TenantOccupied));
        assert_eq!(unit.monthly_rent_cents, Some(120_000));
        assert_eq!(unit.tenant.as_ref().unwrap().name, "Ada");

        apply_unit_values(&mut unit, &values(&[("tenant_name", json!(""))])).unwrap();
        assert!(unit.tenant.is_none());

        let err = apply_unit_values(&mut unit, &values(&[("tenant_email", json!("nope"))]))
            .unwrap_err();
        assert_eq!(err.field, "units[2].tenant_email");
    }
}
