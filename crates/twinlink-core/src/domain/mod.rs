//! Domain model (tokens, envelopes, definitions, states, errors).

pub mod command;
pub mod definition;
pub mod errors;
pub mod ids;
pub mod response;
pub mod state;

pub use command::{CommandEnvelope, OperationKind};
pub use definition::{DefinitionIdentifier, FeatureDefinition};
pub use errors::{CorrelationError, ErrorKind, TransportError, ValidationError};
pub use ids::{CorrelationId, ParseCorrelationIdError};
pub use response::{ResponseEnvelope, ResponseOutcome};
pub use state::RequestState;
