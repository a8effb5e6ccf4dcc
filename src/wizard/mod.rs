//! Property onboarding wizard
//!
//! The wizard is a pure state machine ([`reducer`]) over a [`PropertyDraft`],
//! driven by a [`WizardController`] that owns the collaborators: the draft
//! store, the address resolver, the property-records enricher and the
//! property repository.

pub mod assembler;
pub mod controller;
pub mod draft;
pub mod draft_store;
pub mod normalize;
pub mod prompt;
pub mod reducer;
pub mod step;
pub mod validation;

pub use assembler::PropertyAssembler;
pub use controller::{WizardController, WizardError, WizardServices};
pub use draft::PropertyDraft;
pub use draft_store::{
    DraftRecord, DraftStore, DraftStoreError, FileDraftStore, MemoryDraftStore,
};
pub use prompt::StepPrompter;
pub use step::{AddressInput, ManualAddress, StepData, UnitEdit, WizardStep};
pub use validation::ValidationError;
