//! Sandbox Executor (C3): runs model-generated code in an isolated guest
//! process and mediates every capability call across a synchronous framed
//! message bus (spec §4.3).

pub mod errors;
pub mod executor;
pub mod interceptor;
pub mod limits;
mod process;
pub mod protocol;

pub use errors::{SandboxError, SandboxResult};
pub use executor::{AnswerBlockWire, Observation, SandboxExecutor};
pub use interceptor::{CapabilityError, CapabilityHandler, SearchHitWire};
pub use limits::ResourceLimits;
