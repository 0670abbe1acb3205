//! Error taxonomy for the dispatch engine.
//!
//! Configuration errors never reach this type: they are logged as
//! diagnostics and the offending entry is skipped. `DispatchError` only
//! covers structural errors (rejected at categorization time) and lookup
//! errors (raised from control operations against missing named resources).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("duplicate condition set for base `{base}`")]
    DuplicateConditionSet { base: String },

    #[error("unknown mode `{name}`")]
    UnknownMode { name: String },

    #[error("unknown channel `{name}`")]
    UnknownChannel { name: String },

    #[error("unknown single `{name}`")]
    UnknownSingle { name: String },

    #[error("channel `{name}` is already registered")]
    ChannelAlreadyRegistered { name: String },

    #[error("single `{name}` is already registered")]
    SingleAlreadyRegistered { name: String },
}
