pub mod chc;
pub mod config;
pub mod error;
pub mod fol;
pub mod mbp;
pub mod oracle;
pub mod pdr;

pub use chc::{HornSystem, RelationId, RuleId};
pub use config::Config;
pub use error::{Error, Result};
pub use pdr::{Pdr, UnknownReason, Verdict};
