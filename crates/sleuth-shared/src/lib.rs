//! Sleuth shared types and deterministic investigation logic.
//!
//! Everything in this crate is synchronous and side-effect free: command
//! safety validation, discovery strategy generation, the debugging phase
//! gate and the error signature catalog. Async caching and coalescing live
//! in `sleuthd`.

pub mod discovery;
pub mod error;
pub mod evidence;
pub mod phase;
pub mod resource;
pub mod safety;
pub mod signatures;

pub use discovery::{DiscoveryEngine, DiscoveryOutcome, DiscoveryStrategy, DiscoveryWalk};
pub use error::{Result, SleuthError};
pub use evidence::{DebuggingContext, EvidenceField};
pub use phase::{DebuggingSession, Enforcement, Phase, RetryOutcome};
pub use resource::{ResourceChain, ResourceRef, WarningEvent};
pub use safety::{CommandSafetyValidator, CommandValidation, Dialect, SafetyPolicy, Verdict};
pub use signatures::{ErrorSignatureCatalog, SignatureMatch};

/// Sleuth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
