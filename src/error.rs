//! Engine errors. Everything else the rules produce is ordinary control flow.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The cascade kept finding matches past its pass bound; the orb generator is broken.
    #[error("cascade did not settle after {passes} detection passes")]
    CascadeOverflow { passes: usize },
}
