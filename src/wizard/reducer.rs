//! Pure wizard transitions
//!
//! `advance(draft, data)` returns a new draft moved to the next step, or the
//! first validation failure for the current step. Nothing here performs I/O;
//! the controller resolves addresses and persists snapshots around it.

use serde_json::Value;

use crate::core::records::Enrichment;
use crate::entities::{
    Address, AddressStatus, Furnishing, PropertyUseType, RentalConfiguration, RentalDuration,
    Unit,
};
use crate::wizard::draft::PropertyDraft;
use crate::wizard::normalize::{self, STRUCTURE_FIELDS};
use crate::wizard::step::{AddressInput, ManualAddress, StepData, WizardStep};
use crate::wizard::validation::ValidationError;

/// Merge `data` into the current step, validate it and move forward
pub fn advance(draft: &PropertyDraft, data: &StepData) -> Result<PropertyDraft, ValidationError> {
    let mut next = draft.clone();

    match draft.current_step {
        WizardStep::UserTypeSelect => user_type_step(&mut next, data)?,
        WizardStep::PropertyTypeSelect => property_type_step(&mut next, data)?,
        WizardStep::Address => address_step(&mut next, data)?,
        WizardStep::StructuralDetails => structure_step(&mut next, data)?,
        WizardStep::RentalConfig => rental_step(&mut next, data)?,
        WizardStep::FinancialDetails => financial_step(&mut next, data)?,
        WizardStep::Confirmation => {
            return Err(ValidationError::new(
                "step",
                "confirmation is completed with finish, not advance",
            ))
        }
        WizardStep::Created => {
            return Err(ValidationError::new("step", "property has already been created"))
        }
    }

    reconcile_units(&mut next);
    next.current_step = draft
        .current_step
        .next(next.use_type)
        .unwrap_or(WizardStep::Confirmation);
    Ok(next)
}

/// Previous applicable step, keeping every collected value
///
/// `None` at the first step and once the property exists.
pub fn retreat(draft: &PropertyDraft) -> Option<PropertyDraft> {
    if draft.current_step == WizardStep::Created {
        return None;
    }
    let prev = draft.current_step.prev(draft.use_type)?;
    let mut next = draft.clone();
    next.current_step = prev;
    Some(next)
}

/// Resize the unit list to the door count
///
/// Single-door properties carry no units. Surviving units keep their data and
/// numbers are always `1..=door_count`. Idempotent.
pub fn reconcile_units(draft: &mut PropertyDraft) {
    if draft.door_count <= 1 {
        draft.units.clear();
        return;
    }
    let doors = draft.door_count as usize;
    draft.units.truncate(doors);
    while draft.units.len() < doors {
        draft.units.push(Unit::new(draft.units.len() as u32 + 1));
    }
    for (i, unit) in draft.units.iter_mut().enumerate() {
        unit.number = i as u32 + 1;
    }
}

/// Fill structural fields from a record lookup without touching user input
///
/// Only fields the user has not set are filled; they are remembered in
/// `prefilled` and stay editable.
pub fn apply_prefill(draft: &PropertyDraft, enrichment: &Enrichment) -> PropertyDraft {
    let mut next = draft.clone();
    for field in STRUCTURE_FIELDS {
        let Some(value) = enrichment.attributes.get(*field) else {
            continue;
        };
        if normalize::is_blank(value) || next.structure.contains_key(*field) {
            continue;
        }
        let candidate = crate::entities::FieldValues::from([(field.to_string(), value.clone())]);
        if normalize::structural_details(&candidate).is_err() {
            tracing::debug!(field = *field, "ignoring unusable record value");
            continue;
        }
        next.structure.insert(field.to_string(), value.clone());
        next.prefilled.insert(field.to_string());
    }
    next
}

fn value<'a>(data: &'a StepData, key: &str) -> Option<&'a Value> {
    data.values.get(key).filter(|v| !normalize::is_blank(v))
}

fn reject_unknown(data: &StepData, allowed: &[&str]) -> Result<(), ValidationError> {
    match data.values.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(ValidationError::new(key.as_str(), "is not collected on this step")),
        None => Ok(()),
    }
}

fn user_type_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    reject_unknown(data, &["user_type"])?;
    if let Some(v) = value(data, "user_type") {
        draft.user_type = Some(normalize::choice("user_type", v)?);
    }
    if draft.user_type.is_none() {
        return Err(ValidationError::missing("user_type"));
    }
    Ok(())
}

fn property_type_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    reject_unknown(data, &["property_kind", "use_type", "door_count"])?;
    if let Some(v) = value(data, "property_kind") {
        draft.property_kind = Some(normalize::choice("property_kind", v)?);
    }
    if let Some(v) = value(data, "use_type") {
        draft.use_type = Some(normalize::choice("use_type", v)?);
    }
    let requested = value(data, "door_count")
        .map(|v| normalize::integer("door_count", v, 1, 10_000))
        .transpose()?
        .map(|n| n as u32);

    let kind = draft
        .property_kind
        .ok_or_else(|| ValidationError::missing("property_kind"))?;
    if draft.use_type.is_none() {
        return Err(ValidationError::missing("use_type"));
    }

    match kind.fixed_doors() {
        Some(fixed) => {
            if let Some(n) = requested.filter(|n| *n != fixed) {
                return Err(ValidationError::new(
                    "door_count",
                    format!("a {} has {} door(s), not {}", kind.label(), fixed, n),
                ));
            }
            draft.door_count = fixed;
        }
        None => {
            if let Some(n) = requested {
                draft.door_count = n;
            }
            if draft.door_count < kind.min_doors() {
                return Err(ValidationError::new(
                    "door_count",
                    format!("a {} needs at least {} doors", kind.label(), kind.min_doors()),
                ));
            }
        }
    }
    Ok(())
}

fn manual_address(manual: &ManualAddress) -> Result<Address, ValidationError> {
    let required = [
        ("address.street", &manual.street),
        ("address.city", &manual.city),
        ("address.state", &manual.state),
        ("address.postal_code", &manual.postal_code),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(ValidationError::missing(*field));
    }
    Ok(Address {
        street: manual.street.trim().to_string(),
        unit: manual
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
        city: manual.city.trim().to_string(),
        state: manual.state.trim().to_uppercase(),
        postal_code: manual.postal_code.trim().to_string(),
        formatted: None,
        status: AddressStatus::VerifiedByOverride,
    })
}

fn address_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    reject_unknown(data, &["nickname"])?;
    if let Some(nickname) = data.values.get("nickname") {
        draft.nickname = normalize::text(nickname);
    }

    match &data.address {
        Some(AddressInput::Lookup(_)) => {
            return Err(ValidationError::new("address", "has not been looked up yet"))
        }
        Some(AddressInput::Resolved(address)) => {
            if !address.is_verified() {
                return Err(ValidationError::new(
                    "address",
                    "could not be verified; check it or enter it manually",
                ));
            }
            draft.address = Some(address.clone());
        }
        Some(AddressInput::Manual(manual)) => draft.address = Some(manual_address(manual)?),
        None => {}
    }

    match &draft.address {
        Some(address) if address.is_verified() => Ok(()),
        Some(_) => Err(ValidationError::new("address", "is not verified")),
        None => Err(ValidationError::missing("address")),
    }
}

fn structure_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    normalize::merge_values(&mut draft.structure, &data.values);
    normalize::structural_details(&draft.structure)?;
    for key in data.values.keys() {
        draft.prefilled.remove(key);
    }

    reconcile_units(draft);
    let unit_count = draft.units.len();
    for edit in &data.unit_edits {
        let unit = draft
            .units
            .iter_mut()
            .find(|u| u.number == edit.number)
            .ok_or_else(|| {
                ValidationError::new(
                    format!("units[{}]", edit.number),
                    format!("property has {} unit(s)", unit_count),
                )
            })?;
        normalize::apply_unit_values(unit, &edit.values)?;
    }
    Ok(())
}

fn default_furnishing(use_type: Option<PropertyUseType>) -> Furnishing {
    match use_type {
        Some(PropertyUseType::RentalFurnished | PropertyUseType::VacationRental) => {
            Furnishing::Furnished
        }
        _ => Furnishing::Unfurnished,
    }
}

fn rental_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    reject_unknown(
        data,
        &["furnishing", "rental_duration", "turnover", "platforms", "management_type"],
    )?;
    let existing = draft.rental.as_ref();

    let furnishing = match value(data, "furnishing") {
        Some(v) => normalize::choice("furnishing", v)?,
        None => existing
            .map(|r| r.furnishing)
            .unwrap_or_else(|| default_furnishing(draft.use_type)),
    };
    let duration = match value(data, "rental_duration") {
        Some(v) => normalize::choice("rental_duration", v)?,
        None => existing
            .map(|r| r.duration)
            .ok_or_else(|| ValidationError::missing("rental_duration"))?,
    };
    let turnover = match data.values.get("turnover") {
        Some(v) if normalize::is_blank(v) => None,
        Some(v) => Some(normalize::choice("turnover", v)?),
        None => existing.and_then(|r| r.turnover),
    };
    let platforms = match data.values.get("platforms") {
        Some(v) => normalize::choice_list("platforms", v)?,
        None => existing.map(|r| r.platforms.clone()).unwrap_or_default(),
    };
    let management = match value(data, "management_type") {
        Some(v) => normalize::choice("management_type", v)?,
        None => existing
            .map(|r| r.management)
            .ok_or_else(|| ValidationError::missing("management_type"))?,
    };

    if duration == RentalDuration::ShortTerm && platforms.is_empty() {
        return Err(ValidationError::new(
            "platforms",
            "short-term rentals need at least one booking platform",
        ));
    }

    draft.rental = Some(RentalConfiguration {
        furnishing,
        duration,
        turnover,
        platforms,
        management,
    });
    Ok(())
}

fn financial_step(draft: &mut PropertyDraft, data: &StepData) -> Result<(), ValidationError> {
    normalize::merge_values(&mut draft.financials, &data.values);
    normalize::financial_details(&draft.financials)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::Confidence;
    use crate::entities::{OccupancyStatus, RentalPlatform};
    use serde_json::json;

    fn verified() -> AddressInput {
        AddressInput::Resolved(Address {
            street: "12 Oak St".to_string(),
            unit: None,
            city: "Austin".to_string(),
            state: "TX".to_string(),
            postal_code: "78701".to_string(),
            formatted: None,
            status: AddressStatus::Verified,
        })
    }

    fn through_address(kind: &str, use_type: &str) -> PropertyDraft {
        let draft = PropertyDraft::new("test");
        let draft = advance(&draft, &StepData::new().with("user_type", "investor")).unwrap();
        let draft = advance(
            &draft,
            &StepData::new()
                .with("property_kind", kind)
                .with("use_type", use_type),
        )
        .unwrap();
        advance(&draft, &StepData::new().with_address(verified())).unwrap()
    }

    fn visited(mut draft: PropertyDraft) -> Vec<WizardStep> {
        let mut steps = vec![draft.current_step];
        while draft.current_step != WizardStep::Confirmation {
            let data = match draft.current_step {
                WizardStep::RentalConfig => StepData::new()
                    .with("rental_duration", "long_term")
                    .with("management_type", "self_managed"),
                _ => StepData::new(),
            };
            draft = advance(&draft, &data).unwrap();
            steps.push(draft.current_step);
        }
        steps
    }

    #[test]
    fn test_user_type_required() {
        let draft = PropertyDraft::new("test");
        let err = advance(&draft, &StepData::new()).unwrap_err();
        assert_eq!(err, ValidationError::missing("user_type"));

        let err = advance(&draft, &StepData::new().with("user_type", "landlord")).unwrap_err();
        assert_eq!(err.field, "user_type");
    }

    #[test]
    fn test_primary_never_enters_rental_config() {
        let steps = visited(through_address("single_family", "primary"));
        assert!(!steps.contains(&WizardStep::RentalConfig));
        assert_eq!(
            steps,
            vec![
                WizardStep::StructuralDetails,
                WizardStep::FinancialDetails,
                WizardStep::Confirmation
            ]
        );
    }

    #[test]
    fn test_rental_unfurnished_always_enters_rental_config() {
        for kind in ["single_family", "duplex", "condo"] {
            let steps = visited(through_address(kind, "rental_unfurnished"));
            assert!(steps.contains(&WizardStep::RentalConfig), "{kind}");
        }
    }

    #[test]
    fn test_fixed_kind_sets_doors_and_rejects_contradiction() {
        let draft = PropertyDraft::new("test");
        let draft = advance(&draft, &StepData::new().with("user_type", "homeowner")).unwrap();

        let err = advance(
            &draft,
            &StepData::new()
                .with("property_kind", "duplex")
                .with("use_type", "primary_with_rental")
                .with("door_count", 3),
        )
        .unwrap_err();
        assert_eq!(err.field, "door_count");

        let next = advance(
            &draft,
            &StepData::new()
                .with("property_kind", "Duplex")
                .with("use_type", "primary_with_rental"),
        )
        .unwrap();
        assert_eq!(next.door_count, 2);
        assert_eq!(next.current_step, WizardStep::Address);
    }

    #[test]
    fn test_multi_family_needs_door_count() {
        let draft = PropertyDraft::new("test");
        let draft = advance(&draft, &StepData::new().with("user_type", "investor")).unwrap();
        let base = StepData::new()
            .with("property_kind", "multi_family")
            .with("use_type", "rental_unfurnished");

        let err = advance(&draft, &base).unwrap_err();
        assert_eq!(err.field, "door_count");

        let next = advance(&draft, &base.clone().with("door_count", "12")).unwrap();
        assert_eq!(next.door_count, 12);
        assert_eq!(next.units.len(), 12);
    }

    #[test]
    fn test_property_type_requires_kind_and_use() {
        let draft = PropertyDraft::new("test");
        let draft = advance(&draft, &StepData::new().with("user_type", "investor")).unwrap();
        let err = advance(&draft, &StepData::new().with("use_type", "primary")).unwrap_err();
        assert_eq!(err.field, "property_kind");
        let err = advance(&draft, &StepData::new().with("property_kind", "condo")).unwrap_err();
        assert_eq!(err.field, "use_type");
    }

    #[test]
    fn test_address_gate() {
        let draft = PropertyDraft::new("test");
        let draft = advance(&draft, &StepData::new().with("user_type", "investor")).unwrap();
        let draft = advance(
            &draft,
            &StepData::new()
                .with("property_kind", "condo")
                .with("use_type", "primary"),
        )
        .unwrap();

        assert_eq!(
            advance(&draft, &StepData::new()).unwrap_err(),
            ValidationError::missing("address")
        );

        let mut unverified = match verified() {
            AddressInput::Resolved(a) => a,
            _ => unreachable!(),
        };
        unverified.status = AddressStatus::Unverified;
        let err = advance(
            &draft,
            &StepData::new().with_address(AddressInput::Resolved(unverified)),
        )
        .unwrap_err();
        assert_eq!(err.field, "address");

        let err = advance(
            &draft,
            &StepData::new().with_address(AddressInput::Manual(ManualAddress {
                street: "1 Pine Rd".to_string(),
                city: "Reno".to_string(),
                ..Default::default()
            })),
        )
        .unwrap_err();
        assert_eq!(err.field, "address.state");

        let next = advance(
            &draft,
            &StepData::new().with_address(AddressInput::Manual(ManualAddress {
                street: "1 Pine Rd".to_string(),
                unit: None,
                city: "Reno".to_string(),
                state: "nv".to_string(),
                postal_code: "89501".to_string(),
            })),
        )
        .unwrap();
        let address = next.address.unwrap();
        assert_eq!(address.status, AddressStatus::VerifiedByOverride);
        assert_eq!(address.state, "NV");
    }

    #[test]
    fn test_duplex_units_survive_reentry() {
        let mut draft = through_address("duplex", "primary_with_rental");
        assert_eq!(draft.current_step, WizardStep::StructuralDetails);
        assert_eq!(draft.units.len(), 2);

        draft = advance(
            &draft,
            &StepData::new().with_unit(2, "occupancy", "tenant_occupied"),
        )
        .unwrap();

        for _ in 0..3 {
            draft = retreat(&draft).unwrap();
            assert_eq!(draft.current_step, WizardStep::StructuralDetails);
            assert_eq!(draft.units.len(), 2);
            draft = advance(&draft, &StepData::new()).unwrap();
            assert_eq!(draft.units.len(), 2);
        }
        assert_eq!(draft.units[1].occupancy, Some(OccupancyStatus::TenantOccupied));
        assert_eq!(
            draft.units.iter().map(|u| u.number).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_kind_change_reconciles_units() {
        let mut draft = through_address("fourplex", "rental_unfurnished");
        assert_eq!(draft.units.len(), 4);
        draft = advance(&draft, &StepData::new().with_unit(1, "nickname", "Front")).unwrap();

        while draft.current_step != WizardStep::PropertyTypeSelect {
            draft = retreat(&draft).unwrap();
        }
        draft = advance(&draft, &StepData::new().with("property_kind", "duplex")).unwrap();
        assert_eq!(draft.units.len(), 2);
        assert_eq!(draft.units[0].nickname.as_deref(), Some("Front"));

        draft = retreat(&draft).unwrap();
        draft = advance(&draft, &StepData::new().with("property_kind", "single_family")).unwrap();
        assert_eq!(draft.door_count, 1);
        assert!(draft.units.is_empty());
    }

    #[test]
    fn test_unit_edit_out_of_range() {
        let draft = through_address("duplex", "primary_with_rental");
        let err = advance(&draft, &StepData::new().with_unit(3, "occupancy", "vacant")).unwrap_err();
        assert_eq!(err.field, "units[3]");
    }

    #[test]
    fn test_structure_values_must_coerce() {
        let draft = through_address("single_family", "primary");
        let err = advance(&draft, &StepData::new().with("stories", "two")).unwrap_err();
        assert_eq!(err.field, "stories");

        let next = advance(&draft, &StepData::new().with("square_feet", "1,250")).unwrap();
        assert_eq!(next.structure["square_feet"], json!("1,250"));
    }

    #[test]
    fn test_rental_requirements() {
        let mut draft = through_address("condo", "vacation_rental");
        draft = advance(&draft, &StepData::new()).unwrap();
        assert_eq!(draft.current_step, WizardStep::RentalConfig);

        let err = advance(&draft, &StepData::new().with("management_type", "co_host")).unwrap_err();
        assert_eq!(err, ValidationError::missing("rental_duration"));

        let short_term = StepData::new()
            .with("rental_duration", "short_term")
            .with("management_type", "co_host");
        let err = advance(&draft, &short_term).unwrap_err();
        assert_eq!(err.field, "platforms");

        let next = advance(&draft, &short_term.with("platforms", "airbnb,vrbo")).unwrap();
        let rental = next.rental.unwrap();
        assert_eq!(rental.furnishing, Furnishing::Furnished);
        assert_eq!(rental.platforms, vec![RentalPlatform::Airbnb, RentalPlatform::Vrbo]);
    }

    #[test]
    fn test_confirmation_refuses_advance_and_retreat_at_start() {
        let draft = visited_to_confirmation();
        assert_eq!(advance(&draft, &StepData::new()).unwrap_err().field, "step");
        assert!(retreat(&PropertyDraft::new("test")).is_none());
    }

    fn visited_to_confirmation() -> PropertyDraft {
        let mut draft = through_address("condo", "primary");
        while draft.current_step != WizardStep::Confirmation {
            draft = advance(&draft, &StepData::new()).unwrap();
        }
        draft
    }

    #[test]
    fn test_apply_prefill_respects_user_values() {
        let mut draft = through_address("single_family", "primary");
        draft.structure.insert("year_built".to_string(), json!("1950"));

        let enrichment = Enrichment {
            confidence: Confidence::High,
            attributes: [
                ("year_built".to_string(), json!(1999)),
                ("square_feet".to_string(), json!(1800)),
                ("garage".to_string(), json!("spaceship")),
                ("owner".to_string(), json!("someone")),
            ]
            .into_iter()
            .collect(),
        };
        let next = apply_prefill(&draft, &enrichment);
        assert_eq!(next.structure["year_built"], json!("1950"));
        assert_eq!(next.structure["square_feet"], json!(1800));
        assert!(!next.structure.contains_key("garage"));
        assert!(!next.structure.contains_key("owner"));
        assert_eq!(next.prefilled.len(), 1);

        let edited = advance(&next, &StepData::new().with("square_feet", 1750)).unwrap();
        assert!(edited.prefilled.is_empty());
    }

    #[test]
    fn test_unknown_step_field_rejected() {
        let draft = PropertyDraft::new("test");
        let err = advance(
            &draft,
            &StepData::new().with("user_type", "investor").with("color", "blue"),
        )
        .unwrap_err();
        assert_eq!(err.field, "color");
    }
}
