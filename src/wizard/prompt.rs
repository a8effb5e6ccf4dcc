//! Interactive terminal prompts for each wizard step
//!
//! Prompts only gather input. Everything they return goes through the
//! controller, so validation errors surface the same way as with `--set`.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::entities::{
    FoundationType, Furnishing, GarageType, ManagementType, OccupancyStatus, PropertyKind,
    PropertyUseType, RentalDuration, TurnoverCadence, Unit, UserType,
};
use crate::pricing::format_usd;
use crate::wizard::draft::PropertyDraft;
use crate::wizard::normalize::{FINANCIAL_FIELDS, STRUCTURE_FIELDS};
use crate::wizard::step::{AddressInput, ManualAddress, StepData, WizardStep};

/// Choice keys and labels, in display order
type Options = Vec<(&'static str, &'static str)>;

macro_rules! options {
    ($ty:ty) => {
        <$ty>::ALL
            .iter()
            .map(|v| (v.as_str(), v.label()))
            .collect::<Options>()
    };
}

/// Terminal front end for the onboarding wizard
pub struct StepPrompter {
    theme: ColorfulTheme,
}

impl StepPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Print the step banner with overall progress
    pub fn header(&self, step: WizardStep, progress: u8) {
        println!();
        println!(
            "{} {} {}",
            style("◆").cyan(),
            style(step.label()).bold(),
            style(format!("({}%)", progress)).dim()
        );
        println!("{}", style("─".repeat(50)).dim());
    }

    /// Collect input for `step`, offering what the draft already holds as defaults
    pub fn prompt(&self, draft: &PropertyDraft, step: WizardStep) -> Result<StepData> {
        match step {
            WizardStep::UserTypeSelect => self.user_type(draft),
            WizardStep::PropertyTypeSelect => self.property_type(draft),
            WizardStep::Address => self.address(draft),
            WizardStep::StructuralDetails => self.structure(draft),
            WizardStep::RentalConfig => self.rental(draft),
            WizardStep::FinancialDetails => self.financials(draft),
            WizardStep::Confirmation | WizardStep::Created => Ok(StepData::new()),
        }
    }

    /// Show the review screen; returns true when the user chooses to create
    pub fn review(&self, draft: &PropertyDraft) -> Result<bool> {
        for (label, value) in summary(draft) {
            println!("  {:<16} {}", style(label).dim(), value);
        }
        println!();

        let selection = Select::with_theme(&self.theme)
            .with_prompt("Create this property?")
            .items(&["Create", "Go back"])
            .default(0)
            .interact()
            .into_diagnostic()?;
        Ok(selection == 0)
    }

    fn user_type(&self, draft: &PropertyDraft) -> Result<StepData> {
        let current = draft.user_type.map(|u| u.as_str());
        let key = self.select("Who are you?", &options!(UserType), current)?;
        Ok(StepData::new().with("user_type", key))
    }

    fn property_type(&self, draft: &PropertyDraft) -> Result<StepData> {
        let kind = self.select(
            "Property type",
            &options!(PropertyKind),
            draft.property_kind.map(|k| k.as_str()),
        )?;
        let use_type = self.select(
            "How is it used?",
            &options!(PropertyUseType),
            draft.use_type.map(|u| u.as_str()),
        )?;
        let mut data = StepData::new()
            .with("property_kind", kind)
            .with("use_type", use_type);

        let kind: PropertyKind = kind.parse().map_err(|e: String| miette::miette!(e))?;
        if kind.fixed_doors().is_none() {
            let default = draft.door_count.max(kind.min_doors());
            let doors: u32 = Input::with_theme(&self.theme)
                .with_prompt("Number of doors (units)")
                .default(default)
                .interact_text()
                .into_diagnostic()?;
            data = data.with("door_count", doors);
        }
        Ok(data)
    }

    fn address(&self, draft: &PropertyDraft) -> Result<StepData> {
        let nickname = self.text("Nickname", draft.nickname.clone(), false)?;
        let mut data = StepData::new();
        if let Some(nickname) = nickname {
            data = data.with("nickname", nickname);
        }

        let mut choices = vec!["Look up an address", "Enter it manually"];
        if let Some(address) = &draft.address {
            println!("  {} {}", style("Current:").dim(), address.composite());
            choices.insert(0, "Keep the current address");
        }
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Address")
            .items(&choices)
            .default(0)
            .interact()
            .into_diagnostic()?;

        let input = match (choices[selection], &draft.address) {
            ("Keep the current address", _) => None,
            ("Look up an address", _) => {
                let query: String = Input::with_theme(&self.theme)
                    .with_prompt("Street, city, state ZIP")
                    .interact_text()
                    .into_diagnostic()?;
                Some(AddressInput::Lookup(query))
            }
            (_, current) => {
                let known = current.as_ref().map(ManualAddress::from);
                let known = known.as_ref();
                let manual = ManualAddress {
                    street: self.required("Street", known.map(|m| m.street.clone()))?,
                    unit: self.text("Apt / suite", known.and_then(|m| m.unit.clone()), false)?,
                    city: self.required("City", known.map(|m| m.city.clone()))?,
                    state: self.required("State", known.map(|m| m.state.clone()))?,
                    postal_code: self.required("ZIP code", known.map(|m| m.postal_code.clone()))?,
                };
                Some(AddressInput::Manual(manual))
            }
        };

        if let Some(input) = input {
            data = data.with_address(input);
        }
        Ok(data)
    }

    fn structure(&self, draft: &PropertyDraft) -> Result<StepData> {
        let current = draft.step_values(WizardStep::StructuralDetails);
        let mut data = StepData::new();

        for field in STRUCTURE_FIELDS {
            let default = current.get(*field).map(display_value);
            let mut prompt = field_label(field);
            if draft.prefilled.contains(*field) {
                prompt = format!("{} {}", prompt, style("(from records)").dim());
            }

            let value = match *field {
                "foundation" => self.optional_select(&prompt, &options!(FoundationType), default)?,
                "garage" => self.optional_select(&prompt, &options!(GarageType), default)?,
                _ => self.text(&prompt, default, false)?,
            };
            if let Some(value) = value {
                data = data.with(field, value);
            }
        }

        for unit in &draft.units {
            data = self.unit(unit, data)?;
        }
        Ok(data)
    }

    fn unit(&self, unit: &Unit, mut data: StepData) -> Result<StepData> {
        println!();
        println!("  {} {}", style("▸").cyan(), style(unit.display_name()).bold());

        if let Some(nickname) = self.text("Unit nickname", unit.nickname.clone(), false)? {
            data = data.with_unit(unit.number, "nickname", nickname);
        }
        let occupancy = self.select(
            "Occupancy",
            &options!(OccupancyStatus),
            unit.occupancy.map(|o| o.as_str()),
        )?;
        data = data.with_unit(unit.number, "occupancy", occupancy);

        if occupancy == OccupancyStatus::TenantOccupied.as_str() {
            let rent = unit
                .monthly_rent_cents
                .map(|c| format!("{}.{:02}", c / 100, c % 100));
            if let Some(rent) = self.text("Monthly rent", rent, false)? {
                data = data.with_unit(unit.number, "monthly_rent", rent);
            }
            let tenant = unit.tenant.as_ref().map(|t| t.name.clone());
            if let Some(name) = self.text("Tenant name", tenant, false)? {
                data = data.with_unit(unit.number, "tenant_name", name);
            }
        }
        Ok(data)
    }

    fn rental(&self, draft: &PropertyDraft) -> Result<StepData> {
        let current = draft.step_values(WizardStep::RentalConfig);
        let key = |k: &str| current.get(k).and_then(Value::as_str).map(str::to_string);

        let furnishing = self.select(
            "Furnishing",
            &options!(Furnishing),
            key("furnishing").as_deref(),
        )?;
        let duration = self.select(
            "Typical stay",
            &options!(RentalDuration),
            key("rental_duration").as_deref(),
        )?;
        let management = self.select(
            "Who manages it?",
            &options!(ManagementType),
            key("management_type").as_deref(),
        )?;
        let mut data = StepData::new()
            .with("furnishing", furnishing)
            .with("rental_duration", duration)
            .with("management_type", management);

        if let Some(turnover) =
            self.optional_select("Turnover", &options!(TurnoverCadence), key("turnover"))?
        {
            data = data.with("turnover", turnover);
        }

        if duration == RentalDuration::ShortTerm.as_str() {
            let platforms = self.required("Booking platforms (comma-separated)", key("platforms"))?;
            data = data.with("platforms", platforms);
        }
        Ok(data)
    }

    fn financials(&self, draft: &PropertyDraft) -> Result<StepData> {
        let current = draft.step_values(WizardStep::FinancialDetails);
        let mut data = StepData::new();
        for field in FINANCIAL_FIELDS {
            let default = current.get(*field).map(display_value);
            if let Some(value) = self.text(&field_label(field), default, false)? {
                data = data.with(field, value);
            }
        }
        Ok(data)
    }

    fn select(&self, prompt: &str, options: &Options, current: Option<&str>) -> Result<&'static str> {
        let labels: Vec<&str> = options.iter().map(|(_, label)| *label).collect();
        let default_idx = current
            .and_then(|c| options.iter().position(|(key, _)| *key == c))
            .unwrap_or(0);

        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(default_idx)
            .interact()
            .into_diagnostic()?;
        Ok(options[selection].0)
    }

    /// Select with a leading "(skip)" entry
    fn optional_select(
        &self,
        prompt: &str,
        options: &Options,
        current: Option<String>,
    ) -> Result<Option<String>> {
        let mut labels = vec!["(skip)"];
        labels.extend(options.iter().map(|(_, label)| *label));
        let default_idx = current
            .as_deref()
            .and_then(|c| options.iter().position(|(key, _)| *key == c))
            .map(|i| i + 1)
            .unwrap_or(0);

        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(default_idx)
            .interact()
            .into_diagnostic()?;
        Ok(selection
            .checked_sub(1)
            .map(|i| options[i].0.to_string()))
    }

    fn text(&self, prompt: &str, default: Option<String>, required: bool) -> Result<Option<String>> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(!required);
        if let Some(default) = default.filter(|d| !d.is_empty()) {
            input = input.default(default);
        }
        let value = input.interact_text().into_diagnostic()?;
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn required(&self, prompt: &str, default: Option<String>) -> Result<String> {
        Ok(self.text(prompt, default, true)?.unwrap_or_default())
    }
}

impl Default for StepPrompter {
    fn default() -> Self {
        Self::new()
    }
}

/// Label/value rows describing a draft, for the review screen and `status`
pub fn summary(draft: &PropertyDraft) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let mut row = |label: &str, value: String| rows.push((label.to_string(), value));

    if let Some(user_type) = draft.user_type {
        row("You are", user_type.label().to_string());
    }
    if let Some(kind) = draft.property_kind {
        row("Property type", kind.label().to_string());
    }
    if let Some(use_type) = draft.use_type {
        row("Use", use_type.label().to_string());
    }
    row("Doors", draft.door_count.to_string());
    if let Some(nickname) = &draft.nickname {
        row("Nickname", nickname.clone());
    }
    if let Some(address) = &draft.address {
        row(
            "Address",
            format!("{} ({})", address.composite(), address.status.label()),
        );
    }
    for (key, value) in &draft.structure {
        row(&field_label(key), display_value(value));
    }
    if let Some(rental) = &draft.rental {
        row(
            "Rental",
            format!(
                "{}, {}, {}",
                rental.furnishing.label(),
                rental.duration.label(),
                rental.management.label()
            ),
        );
    }
    for unit in &draft.units {
        let mut parts = vec![unit
            .occupancy
            .map(|o| o.label().to_string())
            .unwrap_or_else(|| "occupancy not set".to_string())];
        if let Some(rent) = unit.monthly_rent_cents {
            parts.push(format!("{}/mo", format_usd(rent)));
        }
        row(&unit.display_name(), parts.join(", "));
    }
    for (key, value) in &draft.financials {
        row(&field_label(key), display_value(value));
    }
    rows
}

/// `year_built` → `Year Built`
fn field_label(field: &str) -> String {
    field
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Address, AddressStatus};
    use serde_json::json;

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("year_built"), "Year Built");
        assert_eq!(field_label("lot_size_sqft"), "Lot Size Sqft");
    }

    #[test]
    fn test_display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("1,250")), "1,250");
        assert_eq!(display_value(&json!(1962)), "1962");
        assert_eq!(display_value(&Value::Null), "");
    }

    #[test]
    fn test_summary_rows() {
        let mut draft = PropertyDraft::new("ada");
        draft.property_kind = Some(PropertyKind::Duplex);
        draft.door_count = 2;
        draft.address = Some(Address {
            street: "12 Oak St".to_string(),
            unit: None,
            city: "Austin".to_string(),
            state: "TX".to_string(),
            postal_code: "78701".to_string(),
            formatted: None,
            status: AddressStatus::VerifiedByOverride,
        });
        let mut unit = Unit::new(1);
        unit.occupancy = Some(OccupancyStatus::TenantOccupied);
        unit.monthly_rent_cents = Some(125_000);
        draft.units = vec![unit, Unit::new(2)];

        let rows = summary(&draft);
        let get = |label: &str| {
            rows.iter()
                .find(|(l, _)| l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("Property type"), "Duplex");
        assert_eq!(get("Address"), "12 Oak St, Austin, TX 78701 (Entered manually)");
        assert_eq!(get("Unit 1"), "Tenant occupied, $1,250.00/mo");
        assert_eq!(get("Unit 2"), "occupancy not set");
    }
}
