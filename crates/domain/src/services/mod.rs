//! Domain services for conference registration.
//!
//! Services contain business logic that operates on domain models.

pub mod intake;
pub mod memory_store;
pub mod notification;
pub mod store;
pub mod validation;

pub use intake::{
    IntakePolicy, RegistrationError, RegistrationOutcome, RegistrationService,
    DEFAULT_NOTIFICATION_TIMEOUT,
};
pub use memory_store::InMemoryRegistrationStore;
pub use notification::{MockRegistrationNotifier, RegistrationNotifier};
pub use store::{RegistrationStore, StoreError};
pub use validation::{validate_registration, RegistrationValidationError};
