//! Property entity type - the validated result of onboarding

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::choice_enum;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

choice_enum! {
    /// Who is onboarding the property
    pub enum UserType ("user type") {
        Homeowner => ("homeowner", "Homeowner"),
        Investor => ("investor", "Investor"),
    }
}

choice_enum! {
    /// How the owner uses the property
    pub enum PropertyUseType ("use type") {
        Primary => ("primary", "Primary residence"),
        PrimaryWithRental => ("primary_with_rental", "Primary residence with rental unit"),
        RentalUnfurnished => ("rental_unfurnished", "Unfurnished rental"),
        RentalFurnished => ("rental_furnished", "Furnished rental"),
        VacationRental => ("vacation_rental", "Vacation rental"),
    }
}

impl PropertyUseType {
    /// Whether the rental configuration step applies
    pub fn has_rental(&self) -> bool {
        !matches!(self, PropertyUseType::Primary)
    }

    /// Whether a unit with the given occupancy fits this use type
    pub fn accepts_occupancy(&self, occupancy: OccupancyStatus) -> bool {
        use OccupancyStatus::*;
        match self {
            PropertyUseType::Primary | PropertyUseType::PrimaryWithRental => {
                occupancy == OwnerOccupied
            }
            PropertyUseType::RentalUnfurnished | PropertyUseType::RentalFurnished => {
                matches!(occupancy, TenantOccupied | Vacant)
            }
            PropertyUseType::VacationRental => matches!(occupancy, ShortTerm | Vacant),
        }
    }
}

choice_enum! {
    /// Building type, which fixes how many doors the property has
    pub enum PropertyKind ("property type") {
        SingleFamily => ("single_family", "Single-Family Home"),
        SingleFamilyWithAdu => ("single_family_with_adu", "Single-Family Home with ADU"),
        Condo => ("condo", "Condo"),
        Townhouse => ("townhouse", "Townhouse"),
        MobileHome => ("mobile_home", "Mobile Home"),
        Duplex => ("duplex", "Duplex"),
        Triplex => ("triplex", "Triplex"),
        Fourplex => ("fourplex", "Fourplex"),
        MultiFamily => ("multi_family", "Multi-Family"),
    }
}

impl PropertyKind {
    /// Door count implied by the building type; `None` means user supplied
    pub fn fixed_doors(&self) -> Option<u32> {
        match self {
            PropertyKind::SingleFamily
            | PropertyKind::Condo
            | PropertyKind::Townhouse
            | PropertyKind::MobileHome => Some(1),
            PropertyKind::SingleFamilyWithAdu | PropertyKind::Duplex => Some(2),
            PropertyKind::Triplex => Some(3),
            PropertyKind::Fourplex => Some(4),
            PropertyKind::MultiFamily => None,
        }
    }

    /// Smallest door count accepted for this building type
    pub fn min_doors(&self) -> u32 {
        self.fixed_doors().unwrap_or(2)
    }
}

choice_enum! {
    pub enum FoundationType ("foundation type") {
        Slab => ("slab", "Slab"),
        Crawlspace => ("crawlspace", "Crawlspace"),
        Basement => ("basement", "Basement"),
        Pier => ("pier", "Pier and beam"),
    }
}

choice_enum! {
    pub enum GarageType ("garage type") {
        NoGarage => ("none", "No garage"),
        Attached => ("attached", "Attached"),
        Detached => ("detached", "Detached"),
        Carport => ("carport", "Carport"),
    }
}

choice_enum! {
    /// Occupancy of a single door
    pub enum OccupancyStatus ("occupancy status") {
        OwnerOccupied => ("owner_occupied", "Owner occupied"),
        TenantOccupied => ("tenant_occupied", "Tenant occupied"),
        Vacant => ("vacant", "Vacant"),
        ShortTerm => ("short_term", "Short-term guests"),
    }
}

choice_enum! {
    pub enum Furnishing ("furnishing") {
        Unfurnished => ("unfurnished", "Unfurnished"),
        Furnished => ("furnished", "Furnished"),
    }
}

choice_enum! {
    /// Typical length of a stay
    pub enum RentalDuration ("rental duration") {
        LongTerm => ("long_term", "Long-term (12+ months)"),
        MediumTerm => ("medium_term", "Medium-term (1-11 months)"),
        ShortTerm => ("short_term", "Short-term (nightly)"),
    }
}

choice_enum! {
    pub enum TurnoverCadence ("turnover cadence") {
        Monthly => ("monthly", "Monthly"),
        Seasonal => ("seasonal", "Seasonal"),
        Annual => ("annual", "Annual"),
        AsNeeded => ("as_needed", "As needed"),
    }
}

choice_enum! {
    pub enum RentalPlatform ("rental platform") {
        Airbnb => ("airbnb", "Airbnb"),
        Vrbo => ("vrbo", "Vrbo"),
        Booking => ("booking", "Booking.com"),
        FurnishedFinder => ("furnished_finder", "Furnished Finder"),
        Direct => ("direct", "Direct bookings"),
        Other => ("other", "Other"),
    }
}

choice_enum! {
    pub enum ManagementType ("management type") {
        SelfManaged => ("self_managed", "Self-managed"),
        PropertyManager => ("property_manager", "Property manager"),
        CoHost => ("co_host", "Co-host"),
    }
}

choice_enum! {
    /// How an address reached its current state
    pub enum AddressStatus ("address status") {
        Unverified => ("unverified", "Unverified"),
        Verified => ("verified", "Verified"),
        VerifiedByOverride => ("verified_by_override", "Entered manually"),
    }
}

/// Structured postal address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    pub city: String,

    /// Two-letter state code
    pub state: String,

    pub postal_code: String,

    /// Display form supplied by the resolver, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,

    pub status: AddressStatus,
}

impl Address {
    /// Whether the address may gate the wizard forward
    pub fn is_verified(&self) -> bool {
        matches!(
            self.status,
            AddressStatus::Verified | AddressStatus::VerifiedByOverride
        )
    }

    /// One-line composite form: `12 Oak St, Apt 2, Austin, TX 78701`
    pub fn composite(&self) -> String {
        let mut parts: Vec<&str> = vec![self.street.trim()];
        if let Some(unit) = self.unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            parts.push(unit);
        }
        parts.push(self.city.trim());
        let tail = format!("{} {}", self.state.trim(), self.postal_code.trim());
        let mut line = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !tail.trim().is_empty() {
            line.push_str(", ");
            line.push_str(tail.trim());
        }
        line
    }

    /// Case- and punctuation-insensitive key for record lookups
    pub fn lookup_key(&self) -> String {
        self.composite()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

/// Contact details for the tenant of a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantContact {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One independently occupiable door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// 1-based door number
    pub number: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<OccupancyStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantContact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent_cents: Option<u64>,
}

impl Unit {
    /// Blank record for door `number`
    pub fn new(number: u32) -> Self {
        Self {
            number,
            nickname: None,
            square_feet: None,
            bedrooms: None,
            occupancy: None,
            tenant: None,
            monthly_rent_cents: None,
        }
    }

    /// Name shown in listings
    pub fn display_name(&self) -> String {
        self.nickname
            .clone()
            .unwrap_or_else(|| format!("Unit {}", self.number))
    }
}

/// Rental setup for non-primary use types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalConfiguration {
    pub furnishing: Furnishing,

    pub duration: RentalDuration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turnover: Option<TurnoverCadence>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<RentalPlatform>,

    pub management: ManagementType,
}

/// Typed structural attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_built: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size_sqft: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stories: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foundation: Option<FoundationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub garage: Option<GarageType>,
}

/// Mortgage terms; every part optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MortgageTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_cents: Option<u64>,

    /// Annual rate in percent (6.25 = 6.25%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate_pct: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment_cents: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_years: Option<u8>,
}

impl MortgageTerms {
    pub fn is_empty(&self) -> bool {
        self == &MortgageTerms::default()
    }
}

/// Typed financial attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price_cents: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value_cents: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortgage: Option<MortgageTerms>,
}

/// Fully validated creation payload handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPayload {
    /// Display name; defaults to the street line
    pub nickname: String,

    pub user_type: UserType,

    pub property_kind: PropertyKind,

    pub use_type: PropertyUseType,

    pub door_count: u32,

    pub address: Address,

    /// Human-readable composite address
    pub display_address: String,

    #[serde(default)]
    pub structure: StructuralDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental: Option<RentalConfiguration>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,

    #[serde(default)]
    pub financials: FinancialDetails,

    /// Setup completion tracked after creation (starts at 0)
    #[serde(default)]
    pub completion_percentage: u8,

    /// Maintenance health score tracked after creation (starts at 0)
    #[serde(default)]
    pub health_score: u8,

    /// Draft this property was assembled from
    pub source_draft: EntityId,

    pub author: String,
}

/// Raw field values as typed by the user, keyed by field name
///
/// Values stay uncoerced (string or number) until assembly.
pub type FieldValues = BTreeMap<String, serde_json::Value>;

/// Partial update applied through the persistence collaborator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub nickname: Option<String>,
    pub current_value_cents: Option<u64>,
    pub mortgage_balance_cents: Option<u64>,
}

impl PropertyPatch {
    pub fn is_empty(&self) -> bool {
        self == &PropertyPatch::default()
    }
}

/// A created property, owned by the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier
    pub id: EntityId,

    #[serde(flatten)]
    pub details: PropertyPayload,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Entity revision number, bumped on every update
    #[serde(default = "default_revision")]
    pub entity_revision: u32,
}

fn default_revision() -> u32 {
    1
}

impl Property {
    /// Wrap a payload as a freshly created property
    pub fn create(payload: PropertyPayload) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Prop),
            details: payload,
            created: Utc::now(),
            entity_revision: 1,
        }
    }

    /// Apply a patch, bumping the revision when anything changed
    pub fn apply(&mut self, patch: &PropertyPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(ref nickname) = patch.nickname {
            self.details.nickname = nickname.trim().to_string();
        }
        if let Some(value) = patch.current_value_cents {
            self.details.financials.current_value_cents = Some(value);
        }
        if let Some(balance) = patch.mortgage_balance_cents {
            self.details
                .financials
                .mortgage
                .get_or_insert_with(MortgageTerms::default)
                .balance_cents = Some(balance);
        }
        self.entity_revision += 1;
    }
}

impl Entity for Property {
    const PREFIX: EntityPrefix = EntityPrefix::Prop;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.details.nickname
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn author(&self) -> &str {
        &self.details.author
    }
}
