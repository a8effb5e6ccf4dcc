//! Wizard controller
//!
//! Wraps the pure reducer with the collaborators: address resolution before
//! the address step, record enrichment after it, a draft snapshot after every
//! transition, and assembly plus persistence on `finish`.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::address::AddressResolver;
use crate::core::config::Preferences;
use crate::core::identity::EntityId;
use crate::core::records::{Confidence, RecordEnricher};
use crate::core::repository::{PersistenceError, PropertyRepository};
use crate::entities::{FieldValues, Property};
use crate::wizard::assembler::PropertyAssembler;
use crate::wizard::draft::PropertyDraft;
use crate::wizard::draft_store::{DraftStore, DraftStoreError};
use crate::wizard::reducer;
use crate::wizard::step::{AddressInput, StepData, WizardStep};
use crate::wizard::validation::ValidationError;

#[derive(Debug, Error, Diagnostic)]
pub enum WizardError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DraftStore(#[from] DraftStoreError),

    #[error("cannot go back from {0}")]
    #[diagnostic(code(doorway::wizard::no_previous_step))]
    NoPreviousStep(WizardStep),

    #[error("finish is only available at confirmation (currently at {0})")]
    #[diagnostic(
        code(doorway::wizard::not_at_confirmation),
        help("advance through the remaining steps first")
    )]
    NotAtConfirmation(WizardStep),

    #[error("draft {0} was already turned into a property")]
    #[diagnostic(
        code(doorway::wizard::finalized),
        help("start a new onboarding with `doorway onboard start`")
    )]
    Finalized(EntityId),

    #[error("property {property} was created but draft {draft} could not be closed: {source}")]
    #[diagnostic(
        code(doorway::wizard::draft_not_closed),
        help("discard the draft with `doorway onboard discard` so it is not finished twice")
    )]
    DraftNotClosed {
        draft: EntityId,
        property: EntityId,
        source: DraftStoreError,
    },
}

/// Collaborators the controller talks to
#[derive(Clone, Copy)]
pub struct WizardServices<'a> {
    pub drafts: &'a dyn DraftStore,
    pub addresses: &'a dyn AddressResolver,
    pub records: &'a dyn RecordEnricher,
    pub properties: &'a dyn PropertyRepository,
}

/// Step state machine for one onboarding session
pub struct WizardController<'a> {
    draft: PropertyDraft,
    services: WizardServices<'a>,
    preferences: Preferences,
    property: Option<Property>,
    last_snapshot_error: Option<DraftStoreError>,
}

impl<'a> WizardController<'a> {
    /// Begin a new draft and take its first snapshot
    pub fn start(
        services: WizardServices<'a>,
        preferences: Preferences,
        author: impl Into<String>,
    ) -> Self {
        let mut controller = Self {
            draft: PropertyDraft::new(author),
            services,
            preferences,
            property: None,
            last_snapshot_error: None,
        };
        controller.snapshot();
        tracing::info!(draft = %controller.draft.id, "onboarding started");
        controller
    }

    /// Continue a stored draft at the step it was left on
    pub fn resume(
        services: WizardServices<'a>,
        preferences: Preferences,
        draft_id: &EntityId,
    ) -> Result<Self, WizardError> {
        let record = services.drafts.load(draft_id)?;
        if record.is_finalized() {
            return Err(WizardError::Finalized(draft_id.clone()));
        }
        Self::from_draft(services, preferences, record.draft)
    }

    /// Continue from a draft the caller already holds
    pub fn from_draft(
        services: WizardServices<'a>,
        preferences: Preferences,
        draft: PropertyDraft,
    ) -> Result<Self, WizardError> {
        if draft.current_step == WizardStep::Created {
            return Err(WizardError::Finalized(draft.id));
        }
        tracing::info!(draft = %draft.id, step = %draft.current_step, "onboarding resumed");
        Ok(Self {
            draft,
            services,
            preferences,
            property: None,
            last_snapshot_error: None,
        })
    }

    pub fn draft(&self) -> &PropertyDraft {
        &self.draft
    }

    pub fn current_step(&self) -> WizardStep {
        self.draft.current_step
    }

    /// The property created by `finish`, once it succeeded
    pub fn property(&self) -> Option<&Property> {
        self.property.as_ref()
    }

    /// Most recent failed snapshot; cleared by the next successful one
    pub fn last_snapshot_error(&self) -> Option<&DraftStoreError> {
        self.last_snapshot_error.as_ref()
    }

    /// Steps on the path for the draft's use type, start to `Created`
    pub fn applicable_steps(&self) -> Vec<WizardStep> {
        WizardStep::path(self.draft.use_type)
    }

    /// Share of applicable steps completed, 0-100
    pub fn progress(&self) -> u8 {
        self.draft.progress()
    }

    /// Values previously captured for a step
    pub fn step_values(&self, step: WizardStep) -> FieldValues {
        self.draft.step_values(step)
    }

    /// Submit data for the current step and move to the next one
    ///
    /// Validation failures leave the controller where it was.
    pub fn advance(&mut self, data: StepData) -> Result<WizardStep, WizardError> {
        let from = self.draft.current_step;
        if from == WizardStep::Confirmation {
            return Err(ValidationError::new("step", "use finish to create the property").into());
        }

        let data = self.resolve_address(data)?;
        let mut next = reducer::advance(&self.draft, &data)?;

        if from == WizardStep::Address {
            next = self.enrich(next);
        }

        self.draft = next;
        self.snapshot();
        tracing::info!(
            draft = %self.draft.id,
            from = %from,
            to = %self.draft.current_step,
            "wizard advanced"
        );
        Ok(self.draft.current_step)
    }

    /// Step back without discarding anything
    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        let previous = reducer::retreat(&self.draft)
            .ok_or(WizardError::NoPreviousStep(self.draft.current_step))?;
        self.draft = previous;
        self.snapshot();
        tracing::debug!(draft = %self.draft.id, to = %self.draft.current_step, "wizard retreated");
        Ok(self.draft.current_step)
    }

    /// Assemble, persist and finalize; only from confirmation
    ///
    /// On validation or persistence failure the controller stays at
    /// confirmation and the draft is kept. `DraftNotClosed` means the property
    /// exists but the stored draft could still be offered for resume.
    pub fn finish(&mut self) -> Result<&Property, WizardError> {
        if self.draft.current_step != WizardStep::Confirmation {
            return Err(WizardError::NotAtConfirmation(self.draft.current_step));
        }

        let payload = PropertyAssembler::assemble(&self.draft)?;
        let property = self.services.properties.create(payload).map_err(|e| {
            tracing::warn!(draft = %self.draft.id, error = %e, "property creation failed");
            e
        })?;

        self.draft.current_step = WizardStep::Created;
        if let Err(e) = self.services.drafts.finalize(&self.draft.id) {
            // A snapshot at Created keeps the draft out of resume as well
            tracing::warn!(draft = %self.draft.id, error = %e, "failed to finalize draft");
            if let Err(source) = self.services.drafts.save(&self.draft) {
                tracing::error!(draft = %self.draft.id, error = %source, "draft left open after finish");
                let property_id = property.id.clone();
                self.property = Some(property);
                return Err(WizardError::DraftNotClosed {
                    draft: self.draft.id.clone(),
                    property: property_id,
                    source,
                });
            }
        }

        tracing::info!(draft = %self.draft.id, property = %property.id, "onboarding finished");
        Ok(&*self.property.insert(property))
    }

    fn resolve_address(&self, mut data: StepData) -> Result<StepData, WizardError> {
        if let Some(AddressInput::Lookup(text)) = &data.address {
            let address = self
                .services
                .addresses
                .resolve(text)
                .map_err(|e| ValidationError::new("address", e.to_string()))?;
            data.address = Some(AddressInput::Resolved(address));
        }
        Ok(data)
    }

    fn enrich(&self, draft: PropertyDraft) -> PropertyDraft {
        if !self.preferences.prefill_from_records {
            return draft;
        }
        let Some(address) = draft.address.as_ref() else {
            return draft;
        };

        match self.services.records.lookup(address) {
            Ok(found) if found.confidence == Confidence::High => {
                let next = reducer::apply_prefill(&draft, &found);
                tracing::info!(
                    draft = %draft.id,
                    fields = next.prefilled.len(),
                    "structural details prefilled from records"
                );
                next
            }
            Ok(found) => {
                tracing::debug!(confidence = ?found.confidence, "record match not confident enough");
                draft
            }
            Err(e) => {
                tracing::debug!(error = %e, "enrichment unavailable");
                draft
            }
        }
    }

    fn snapshot(&mut self) {
        match self.services.drafts.save(&self.draft) {
            Ok(()) => self.last_snapshot_error = None,
            Err(e) => {
                tracing::warn!(draft = %self.draft.id, error = %e, "draft snapshot failed");
                self.last_snapshot_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::OfflineAddressResolver;
    use crate::core::records::{Enrichment, EnrichmentUnavailable, NoEnrichment};
    use crate::core::repository::MemoryPropertyStore;
    use crate::entities::{Address, PropertyPatch, PropertyPayload, UserType};
    use crate::wizard::draft_store::{DraftRecord, MemoryDraftStore};
    use crate::wizard::step::ManualAddress;
    use serde_json::json;

    struct Fixture {
        drafts: MemoryDraftStore,
        properties: MemoryPropertyStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                drafts: MemoryDraftStore::new(),
                properties: MemoryPropertyStore::new(),
            }
        }

        fn services<'a>(&'a self, records: &'a dyn RecordEnricher) -> WizardServices<'a> {
            WizardServices {
                drafts: &self.drafts,
                addresses: &OfflineAddressResolver,
                records,
                properties: &self.properties,
            }
        }
    }

    struct FixedRecords(Confidence);

    impl RecordEnricher for FixedRecords {
        fn lookup(&self, _address: &Address) -> Result<Enrichment, EnrichmentUnavailable> {
            Ok(Enrichment {
                confidence: self.0,
                attributes: [
                    ("year_built".to_string(), json!(1984)),
                    ("bedrooms".to_string(), json!(3)),
                ]
                .into_iter()
                .collect(),
            })
        }
    }

    struct BrokenDrafts;

    impl DraftStore for BrokenDrafts {
        fn save(&self, _draft: &PropertyDraft) -> Result<(), DraftStoreError> {
            Err(DraftStoreError::Storage("disk full".to_string()))
        }
        fn load(&self, id: &EntityId) -> Result<DraftRecord, DraftStoreError> {
            Err(DraftStoreError::NotFound(id.to_string()))
        }
        fn finalize(&self, _id: &EntityId) -> Result<(), DraftStoreError> {
            Err(DraftStoreError::Storage("disk full".to_string()))
        }
        fn list(&self) -> Result<Vec<DraftRecord>, DraftStoreError> {
            Ok(Vec::new())
        }
        fn discard(&self, id: &EntityId) -> Result<(), DraftStoreError> {
            Err(DraftStoreError::NotFound(id.to_string()))
        }
    }

    /// Saves work, closing a draft does not
    struct StuckFinalize(MemoryDraftStore);

    impl DraftStore for StuckFinalize {
        fn save(&self, draft: &PropertyDraft) -> Result<(), DraftStoreError> {
            self.0.save(draft)
        }
        fn load(&self, id: &EntityId) -> Result<DraftRecord, DraftStoreError> {
            self.0.load(id)
        }
        fn finalize(&self, _id: &EntityId) -> Result<(), DraftStoreError> {
            Err(DraftStoreError::Storage("locked".to_string()))
        }
        fn list(&self) -> Result<Vec<DraftRecord>, DraftStoreError> {
            self.0.list()
        }
        fn discard(&self, id: &EntityId) -> Result<(), DraftStoreError> {
            self.0.discard(id)
        }
    }

    struct FailingRepository;

    impl PropertyRepository for FailingRepository {
        fn create(&self, _payload: PropertyPayload) -> Result<Property, PersistenceError> {
            Err(PersistenceError::Storage("offline".to_string()))
        }
        fn update(&self, id: &EntityId, _patch: &PropertyPatch) -> Result<Property, PersistenceError> {
            Err(PersistenceError::NotFound(id.to_string()))
        }
        fn delete(&self, id: &EntityId) -> Result<(), PersistenceError> {
            Err(PersistenceError::NotFound(id.to_string()))
        }
        fn get(&self, _id: &EntityId) -> Result<Option<Property>, PersistenceError> {
            Ok(None)
        }
        fn list(&self) -> Result<Vec<Property>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    fn to_structure(wizard: &mut WizardController<'_>, kind: &str, use_type: &str) {
        wizard
            .advance(StepData::new().with("user_type", "homeowner"))
            .unwrap();
        wizard
            .advance(
                StepData::new()
                    .with("property_kind", kind)
                    .with("use_type", use_type),
            )
            .unwrap();
        wizard
            .advance(
                StepData::new()
                    .with("nickname", "Oak house")
                    .with_address(AddressInput::Lookup("12 Oak St, Austin, TX 78701".to_string())),
            )
            .unwrap();
    }

    #[test]
    fn test_full_duplex_onboarding() {
        let fx = Fixture::new();
        let mut wizard = WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        to_structure(&mut wizard, "duplex", "primary_with_rental");
        assert_eq!(wizard.current_step(), WizardStep::StructuralDetails);
        assert_eq!(wizard.draft().units.len(), 2);

        wizard
            .advance(
                StepData::new()
                    .with("square_feet", "2,400")
                    .with_unit(1, "occupancy", "owner_occupied")
                    .with_unit(2, "occupancy", "tenant_occupied")
                    .with_unit(2, "monthly_rent", "$1,450"),
            )
            .unwrap();
        assert_eq!(wizard.current_step(), WizardStep::RentalConfig);
        wizard
            .advance(
                StepData::new()
                    .with("rental_duration", "long_term")
                    .with("management_type", "self_managed"),
            )
            .unwrap();
        wizard
            .advance(StepData::new().with("purchase_price", "$410,000"))
            .unwrap();
        assert_eq!(wizard.current_step(), WizardStep::Confirmation);
        assert_eq!(wizard.progress(), 85);

        let property = wizard.finish().unwrap().clone();
        assert_eq!(property.details.door_count, 2);
        assert_eq!(property.details.nickname, "Oak house");
        assert_eq!(property.details.structure.square_feet, Some(2400));
        assert_eq!(property.details.units[1].monthly_rent_cents, Some(145_000));
        assert_eq!(wizard.current_step(), WizardStep::Created);
        assert_eq!(wizard.progress(), 100);

        let record = fx.drafts.load(&wizard.draft().id).unwrap();
        assert!(record.finalized);
        assert_eq!(fx.properties.list().unwrap().len(), 1);

        let err = WizardController::resume(
            fx.services(&NoEnrichment),
            Preferences::default(),
            &wizard.draft().id,
        )
        .err()
        .unwrap();
        assert!(matches!(err, WizardError::Finalized(_)));
    }

    #[test]
    fn test_resume_then_empty_advance_matches_continuous_run() {
        let fx = Fixture::new();
        let mut continuous =
            WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        to_structure(&mut continuous, "triplex", "rental_furnished");

        let other = Fixture::new();
        other.drafts.save(continuous.draft()).unwrap();
        let mut resumed = WizardController::resume(
            other.services(&NoEnrichment),
            Preferences::default(),
            &continuous.draft().id,
        )
        .unwrap();
        assert_eq!(resumed.current_step(), WizardStep::StructuralDetails);

        resumed.advance(StepData::new()).unwrap();
        continuous.advance(StepData::new()).unwrap();
        assert_eq!(resumed.draft(), continuous.draft());
        assert_eq!(resumed.current_step(), WizardStep::RentalConfig);
        assert_eq!(resumed.draft().units.len(), 3);

        let rental = StepData::new()
            .with("rental_duration", "medium_term")
            .with("management_type", "property_manager");
        continuous.advance(rental.clone()).unwrap();
        resumed.advance(rental).unwrap();
        assert_eq!(resumed.draft(), continuous.draft());
        assert_eq!(resumed.current_step(), WizardStep::FinancialDetails);
    }

    #[test]
    fn test_validation_failure_does_not_move() {
        let fx = Fixture::new();
        let mut wizard = WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        wizard
            .advance(StepData::new().with("user_type", "investor"))
            .unwrap();
        wizard
            .advance(
                StepData::new()
                    .with("property_kind", "condo")
                    .with("use_type", "primary"),
            )
            .unwrap();

        let err = wizard
            .advance(StepData::new().with_address(AddressInput::Lookup("somewhere nice".to_string())))
            .unwrap_err();
        assert!(matches!(err, WizardError::Validation(ref v) if v.field == "address"));
        assert_eq!(wizard.current_step(), WizardStep::Address);

        wizard
            .advance(StepData::new().with_address(AddressInput::Manual(ManualAddress {
                street: "9 Hill Rd".to_string(),
                unit: None,
                city: "Taos".to_string(),
                state: "NM".to_string(),
                postal_code: "87571".to_string(),
            })))
            .unwrap();
        assert_eq!(wizard.current_step(), WizardStep::StructuralDetails);
    }

    #[test]
    fn test_retreat_refused_at_first_step() {
        let fx = Fixture::new();
        let mut wizard = WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        assert!(matches!(
            wizard.retreat(),
            Err(WizardError::NoPreviousStep(WizardStep::UserTypeSelect))
        ));
    }

    #[test]
    fn test_reentered_step_exposes_values() {
        let fx = Fixture::new();
        let mut wizard = WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        to_structure(&mut wizard, "townhouse", "primary");
        wizard.retreat().unwrap();
        wizard.retreat().unwrap();
        assert_eq!(wizard.current_step(), WizardStep::PropertyTypeSelect);
        let values = wizard.step_values(WizardStep::PropertyTypeSelect);
        assert_eq!(values["property_kind"], json!("townhouse"));
        assert_eq!(values["use_type"], json!("primary"));
        assert!(!wizard.applicable_steps().contains(&WizardStep::RentalConfig));
    }

    #[test]
    fn test_rental_step_applies_until_use_is_known() {
        let fx = Fixture::new();
        let wizard = WizardController::start(fx.services(&NoEnrichment), Preferences::default(), "ada");
        let steps = wizard.applicable_steps();
        assert_eq!(steps.len(), WizardStep::ALL.len());
        assert_eq!(steps.last(), Some(&WizardStep::Created));
    }

    #[test]
    fn test_high_confidence_records_prefill() {
        let fx = Fixture::new();
        let records = FixedRecords(Confidence::High);
        let mut wizard = WizardController::start(fx.services(&records), Preferences::default(), "ada");
        to_structure(&mut wizard, "single_family", "primary");
        assert_eq!(wizard.draft().structure["year_built"], json!(1984));
        assert!(wizard.draft().prefilled.contains("bedrooms"));
    }

    #[test]
    fn test_low_confidence_or_disabled_preference_skips_prefill() {
        let fx = Fixture::new();
        let medium = FixedRecords(Confidence::Medium);
        let mut wizard = WizardController::start(fx.services(&medium), Preferences::default(), "ada");
        to_structure(&mut wizard, "single_family", "primary");
        assert!(wizard.draft().structure.is_empty());

        let high = FixedRecords(Confidence::High);
        let prefs = Preferences {
            prefill_from_records: false,
            ..Preferences::default()
        };
        let mut wizard = WizardController::start(fx.services(&high), prefs, "ada");
        to_structure(&mut wizard, "single_family", "primary");
        assert!(wizard.draft().structure.is_empty());
    }

    #[test]
    fn test_snapshot_failure_does_not_block() {
        let properties = MemoryPropertyStore::new();
        let services = WizardServices {
            drafts: &BrokenDrafts,
            addresses: &OfflineAddressResolver,
            records: &NoEnrichment,
            properties: &properties,
        };
        let mut wizard = WizardController::start(services, Preferences::default(), "ada");
        assert!(wizard.last_snapshot_error().is_some());
        wizard
            .advance(StepData::new().with("user_type", "investor"))
            .unwrap();
        assert_eq!(wizard.current_step(), WizardStep::PropertyTypeSelect);
        assert!(wizard.last_snapshot_error().is_some());
    }

    #[test]
    fn test_finish_failure_stays_at_confirmation() {
        let drafts = MemoryDraftStore::new();
        let services = WizardServices {
            drafts: &drafts,
            addresses: &OfflineAddressResolver,
            records: &NoEnrichment,
            properties: &FailingRepository,
        };
        let mut wizard = WizardController::start(services, Preferences::default(), "ada");
        assert!(matches!(
            wizard.finish(),
            Err(WizardError::NotAtConfirmation(WizardStep::UserTypeSelect))
        ));

        to_structure(&mut wizard, "condo", "primary");
        wizard.advance(StepData::new()).unwrap();
        wizard.advance(StepData::new()).unwrap();
        assert_eq!(wizard.current_step(), WizardStep::Confirmation);
        assert!(wizard.advance(StepData::new()).is_err());

        let err = wizard.finish().unwrap_err();
        assert!(matches!(err, WizardError::Persistence(_)));
        assert_eq!(wizard.current_step(), WizardStep::Confirmation);
        assert!(!drafts.load(&wizard.draft().id).unwrap().finalized);
    }

    #[test]
    fn test_failed_finalize_still_closes_draft() {
        let drafts = StuckFinalize(MemoryDraftStore::new());
        let properties = MemoryPropertyStore::new();
        let services = WizardServices {
            drafts: &drafts,
            addresses: &OfflineAddressResolver,
            records: &NoEnrichment,
            properties: &properties,
        };
        let mut wizard = WizardController::start(services, Preferences::default(), "ada");
        to_structure(&mut wizard, "condo", "primary");
        wizard.advance(StepData::new()).unwrap();
        wizard.advance(StepData::new()).unwrap();
        wizard.finish().unwrap();
        let id = wizard.draft().id.clone();

        assert_eq!(drafts.load(&id).unwrap().draft.current_step, WizardStep::Created);
        assert!(drafts.resumable().unwrap().is_empty());
        assert!(matches!(
            WizardController::resume(services, Preferences::default(), &id),
            Err(WizardError::Finalized(_))
        ));
        assert_eq!(properties.list().unwrap().len(), 1);
    }

    #[test]
    fn test_finish_reports_draft_left_open() {
        let properties = MemoryPropertyStore::new();
        let services = WizardServices {
            drafts: &BrokenDrafts,
            addresses: &OfflineAddressResolver,
            records: &NoEnrichment,
            properties: &properties,
        };
        let mut wizard = WizardController::start(services, Preferences::default(), "ada");
        to_structure(&mut wizard, "condo", "primary");
        wizard.advance(StepData::new()).unwrap();
        wizard.advance(StepData::new()).unwrap();

        let err = wizard.finish().unwrap_err();
        assert!(matches!(err, WizardError::DraftNotClosed { .. }));
        assert_eq!(wizard.current_step(), WizardStep::Created);
        assert!(wizard.property().is_some());
        assert_eq!(properties.list().unwrap().len(), 1);
    }

    #[test]
    fn test_from_draft_continues_held_draft() {
        let fx = Fixture::new();
        let mut draft = PropertyDraft::new("ada");
        draft.user_type = Some(UserType::Investor);
        draft.current_step = WizardStep::PropertyTypeSelect;

        let wizard =
            WizardController::from_draft(fx.services(&NoEnrichment), Preferences::default(), draft.clone())
                .unwrap();
        assert_eq!(wizard.current_step(), WizardStep::PropertyTypeSelect);
        assert_eq!(wizard.draft(), &draft);

        draft.current_step = WizardStep::Created;
        assert!(matches!(
            WizardController::from_draft(fx.services(&NoEnrichment), Preferences::default(), draft),
            Err(WizardError::Finalized(_))
        ));
    }
}
