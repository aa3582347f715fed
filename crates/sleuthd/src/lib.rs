//! sleuthd - async side of the Sleuth investigation control plane.
//!
//! Result caching, query coalescing, configuration and the `ControlPlane`
//! context object that ties them to the pure logic in `sleuth-shared`.

pub mod cache;
pub mod coalescer;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod logging;

pub use cache::{CacheStats, ResultCache};
pub use coalescer::QueryCoalescer;
pub use config::SleuthConfig;
pub use control_plane::{ControlPlane, SweepTask};
pub use error::ComputeError;
