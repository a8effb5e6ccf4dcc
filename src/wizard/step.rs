//! Wizard states and the data submitted for each

use crate::choice_enum;
use crate::entities::{Address, FieldValues, PropertyUseType};

choice_enum! {
    /// Onboarding states in ordinal order
    pub enum WizardStep ("wizard step") {
        UserTypeSelect => ("user_type", "Who are you?"),
        PropertyTypeSelect => ("property_type", "Property type"),
        Address => ("address", "Address"),
        StructuralDetails => ("structure", "Structural details"),
        RentalConfig => ("rental", "Rental setup"),
        FinancialDetails => ("financials", "Financial details"),
        Confirmation => ("confirmation", "Review and confirm"),
        Created => ("created", "Created"),
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        WizardStep::UserTypeSelect
    }
}

impl WizardStep {
    pub fn ordinal(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Whether the step is on the path for `use_type`
    ///
    /// The rental step is skipped only once the use type is known to be primary.
    pub fn applies_to(&self, use_type: Option<PropertyUseType>) -> bool {
        match self {
            WizardStep::RentalConfig => use_type.map_or(true, |u| u.has_rental()),
            _ => true,
        }
    }

    /// Following state, skipping steps that do not apply
    pub fn next(&self, use_type: Option<PropertyUseType>) -> Option<WizardStep> {
        Self::ALL[self.ordinal() + 1..]
            .iter()
            .copied()
            .find(|s| s.applies_to(use_type))
    }

    /// Preceding state, skipping steps that do not apply
    pub fn prev(&self, use_type: Option<PropertyUseType>) -> Option<WizardStep> {
        Self::ALL[..self.ordinal()]
            .iter()
            .rev()
            .copied()
            .find(|s| s.applies_to(use_type))
    }

    /// Every step from start to `Created` for a use type
    pub fn path(use_type: Option<PropertyUseType>) -> Vec<WizardStep> {
        Self::ALL
            .iter()
            .copied()
            .filter(|s| s.applies_to(use_type))
            .collect()
    }
}

/// How the user supplied an address
#[derive(Debug, Clone, PartialEq)]
pub enum AddressInput {
    /// Free text still to be resolved by the address collaborator
    Lookup(String),

    /// Result returned by the address collaborator
    Resolved(Address),

    /// Fields typed by hand, bypassing verification
    Manual(ManualAddress),
}

/// Hand-entered address; accepted as verified-by-override when complete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualAddress {
    pub street: String,
    pub unit: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl From<&Address> for ManualAddress {
    fn from(address: &Address) -> Self {
        Self {
            street: address.street.clone(),
            unit: address.unit.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
        }
    }
}

/// Edit of one unit, by 1-based door number
#[derive(Debug, Clone, PartialEq)]
pub struct UnitEdit {
    pub number: u32,
    pub values: FieldValues,
}

/// Everything submitted when advancing from a step
///
/// Empty data is valid: it re-submits what the draft already holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepData {
    pub values: FieldValues,
    pub address: Option<AddressInput>,
    pub unit_edits: Vec<UnitEdit>,
}

impl StepData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style single value
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn with_address(mut self, address: AddressInput) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_unit(mut self, number: u32, key: &str, value: impl Into<serde_json::Value>) -> Self {
        match self.unit_edits.iter_mut().find(|e| e.number == number) {
            Some(edit) => {
                edit.values.insert(key.to_string(), value.into());
            }
            None => self.unit_edits.push(UnitEdit {
                number,
                values: FieldValues::from([(key.to_string(), value.into())]),
            }),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.address.is_none() && self.unit_edits.is_empty()
    }
}
