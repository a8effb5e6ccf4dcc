//! Entity type definitions
//!
//! - [`Property`] - a validated, created property with its doors
//! - [`Unit`] - one independently occupiable door of a property
//! - [`RentalConfiguration`] - how a non-primary property is rented out

pub mod choice;
pub mod property;

pub use property::{
    Address, AddressStatus, FieldValues, FinancialDetails, FoundationType, Furnishing, GarageType,
    ManagementType, MortgageTerms, OccupancyStatus, Property, PropertyKind, PropertyPatch,
    PropertyPayload, PropertyUseType, RentalConfiguration, RentalDuration, RentalPlatform,
    StructuralDetails, TenantContact, TurnoverCadence, Unit, UserType,
};
