//! Draft to creation payload
//!
//! The single place a draft's raw values are coerced and checked as a whole.
//! Validation stops at the first violation and never yields a partial payload.

use crate::entities::{PropertyPayload, PropertyUseType};
use crate::wizard::draft::PropertyDraft;
use crate::wizard::normalize;
use crate::wizard::validation::ValidationError;

pub struct PropertyAssembler;

impl PropertyAssembler {
    pub fn assemble(draft: &PropertyDraft) -> Result<PropertyPayload, ValidationError> {
        let user_type = draft
            .user_type
            .ok_or_else(|| ValidationError::missing("user_type"))?;
        let property_kind = draft
            .property_kind
            .ok_or_else(|| ValidationError::missing("property_kind"))?;
        let use_type = draft
            .use_type
            .ok_or_else(|| ValidationError::missing("use_type"))?;

        let address = draft
            .address
            .clone()
            .ok_or_else(|| ValidationError::missing("address"))?;
        if !address.is_verified() {
            return Err(ValidationError::new("address", "is not verified"));
        }

        if draft.door_count < 1 {
            return Err(ValidationError::new("door_count", "must be at least 1"));
        }
        if let Some(fixed) = property_kind.fixed_doors() {
            if draft.door_count != fixed {
                return Err(ValidationError::new(
                    "door_count",
                    format!("a {} has {} door(s)", property_kind.label(), fixed),
                ));
            }
        }

        let units = if draft.door_count > 1 {
            Self::check_units(draft, use_type)?;
            draft.units.clone()
        } else {
            Vec::new()
        };

        let rental = if use_type.has_rental() {
            Some(
                draft
                    .rental
                    .clone()
                    .ok_or_else(|| ValidationError::missing("rental"))?,
            )
        } else {
            None
        };

        let structure = normalize::structural_details(&draft.structure)?;
        let financials = normalize::financial_details(&draft.financials)?;

        let display_address = address
            .formatted
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| address.composite());
        let nickname = draft
            .nickname
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(address.street.trim())
            .to_string();

        Ok(PropertyPayload {
            nickname,
            user_type,
            property_kind,
            use_type,
            door_count: draft.door_count,
            address,
            display_address,
            structure,
            rental,
            units,
            financials,
            completion_percentage: 0,
            health_score: 0,
            source_draft: draft.id.clone(),
            author: draft.author.clone(),
        })
    }

    fn check_units(draft: &PropertyDraft, use_type: PropertyUseType) -> Result<(), ValidationError> {
        if draft.units.len() != draft.door_count as usize {
            return Err(ValidationError::new(
                "units",
                format!(
                    "expected {} units, found {}",
                    draft.door_count,
                    draft.units.len()
                ),
            ));
        }

        let mut consistent = false;
        for unit in &draft.units {
            let occupancy = unit.occupancy.ok_or_else(|| {
                ValidationError::new(format!("units[{}].occupancy", unit.number), "is required")
            })?;
            consistent |= use_type.accepts_occupancy(occupancy);
        }

        if !consistent {
            return Err(ValidationError::new(
                "units",
                format!("no unit has an occupancy that fits a {}", use_type.label().to_lowercase()),
            ));
        }
        Ok(())
    }
}
