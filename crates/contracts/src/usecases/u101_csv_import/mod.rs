pub mod entity_kind;
pub mod request;
pub mod response;

pub use entity_kind::EntityKind;
pub use request::CommitRequest;
pub use response::{CommitResponse, InvalidRowSample, SkippedRow, ValidRowSample, ValidateResponse};
