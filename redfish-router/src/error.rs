use thiserror::Error;

use crate::param::ParamType;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("invalid route pattern: {0}")]
    InvalidPattern(String),

    #[error("route {0:?} conflicts with an already-registered route")]
    DuplicateRoute(String),

    #[error("route {0:?} has no handler")]
    MissingHandler(String),

    #[error("router has not been validated; call Router::validate() before serving requests")]
    NotValidated,

    #[error("route {0:?} handler declares {1} parameter(s) but the pattern has {2}")]
    HandlerArityMismatch(String, usize, usize),

    #[error("route {0:?} handler parameter {1} is declared {2} but the pattern has {3} there")]
    HandlerTypeMismatch(String, usize, ParamType, ParamType),
}
