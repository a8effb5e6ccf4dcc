//! Property draft - the accumulator threaded through the wizard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::{
    Address, FieldValues, PropertyKind, PropertyUseType, RentalConfiguration, Unit, UserType,
};
use crate::wizard::step::WizardStep;

/// Everything collected so far, valid or not
///
/// Structural and financial values stay raw until assembly; every other field
/// is typed because its step validates it before the draft moves on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub id: EntityId,

    #[serde(default)]
    pub current_step: WizardStep,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_kind: Option<PropertyKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<PropertyUseType>,

    #[serde(default = "default_door_count")]
    pub door_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(default, skip_serializing_if = "FieldValues::is_empty")]
    pub structure: FieldValues,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental: Option<RentalConfiguration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,

    #[serde(default, skip_serializing_if = "FieldValues::is_empty")]
    pub financials: FieldValues,

    /// Structural fields filled from property records rather than typed
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub prefilled: BTreeSet<String>,

    pub author: String,

    pub created: DateTime<Utc>,
}

fn default_door_count() -> u32 {
    1
}

impl PropertyDraft {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Drft),
            current_step: WizardStep::UserTypeSelect,
            user_type: None,
            property_kind: None,
            use_type: None,
            door_count: 1,
            nickname: None,
            address: None,
            structure: FieldValues::new(),
            rental: None,
            units: Vec::new(),
            financials: FieldValues::new(),
            prefilled: BTreeSet::new(),
            author: author.into(),
            created: Utc::now(),
        }
    }

    /// Share of the draft's path completed, 0-100
    ///
    /// `Created` is not counted, so reaching it is 100.
    pub fn progress(&self) -> u8 {
        let steps: Vec<WizardStep> = WizardStep::path(self.use_type)
            .into_iter()
            .filter(|s| *s != WizardStep::Created)
            .collect();
        let done = steps
            .iter()
            .position(|s| *s == self.current_step)
            .unwrap_or(steps.len());
        (done * 100 / steps.len().max(1)) as u8
    }

    /// Values previously captured for a step, keyed like step input
    ///
    /// Re-entering a step shows these instead of blank fields.
    pub fn step_values(&self, step: WizardStep) -> FieldValues {
        let mut values = FieldValues::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                values.insert(key.to_string(), value);
            }
        };

        match step {
            WizardStep::UserTypeSelect => {
                put("user_type", self.user_type.map(|u| u.as_str().into()));
            }
            WizardStep::PropertyTypeSelect => {
                put("property_kind", self.property_kind.map(|k| k.as_str().into()));
                put("use_type", self.use_type.map(|u| u.as_str().into()));
                put("door_count", Some(self.door_count.into()));
            }
            WizardStep::Address => {
                put("nickname", self.nickname.clone().map(Value::from));
                if let Some(address) = &self.address {
                    put("street", Some(address.street.clone().into()));
                    put("unit", address.unit.clone().map(Value::from));
                    put("city", Some(address.city.clone().into()));
                    put("state", Some(address.state.clone().into()));
                    put("postal_code", Some(address.postal_code.clone().into()));
                    put("status", Some(address.status.as_str().into()));
                }
            }
            WizardStep::StructuralDetails => return self.structure.clone(),
            WizardStep::RentalConfig => {
                if let Some(rental) = &self.rental {
                    put("furnishing", Some(rental.furnishing.as_str().into()));
                    put("rental_duration", Some(rental.duration.as_str().into()));
                    put("turnover", rental.turnover.map(|t| t.as_str().into()));
                    let platforms: Vec<&str> = rental.platforms.iter().map(|p| p.as_str()).collect();
                    if !platforms.is_empty() {
                        put("platforms", Some(platforms.join(",").into()));
                    }
                    put("management_type", Some(rental.management.as_str().into()));
                }
            }
            WizardStep::FinancialDetails => return self.financials.clone(),
            WizardStep::Confirmation | WizardStep::Created => {}
        }
        values
    }
}

impl Entity for PropertyDraft {
    const PREFIX: EntityPrefix = EntityPrefix::Drft;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        self.nickname
            .as_deref()
            .or_else(|| self.address.as_ref().map(|a| a.street.as_str()))
            .unwrap_or("(untitled)")
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.author
    }
}
