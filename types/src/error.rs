use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("identifier must not be empty")]
    EmptyId,

    #[error("identifier {0:?} must not contain the '::' separator")]
    ReservedSeparator(String),

    #[error("malformed meeting member id: {0}")]
    MalformedMemberId(String),
}
