//! Test utilities for exercising `oversend` pipelines and endpoints.
//!
//! [`ScriptedTransport`] lets a test decide the outcome of each send while
//! recording every envelope the transport saw. The remaining helpers build
//! payloads and capture logs.
//!
//! ```rust
//! use oversend::transport::TransportError;
//! use oversend_testing::{Scripted, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new(250)
//!     .then(Scripted::Fail(TransportError::other("unauthorised")));
//! # let _ = transport;
//! ```

pub mod logging;
pub mod payloads;
pub mod transport;

pub use logging::{LoggerHandle, logger};
pub use payloads::{filled, oversized};
pub use transport::{Scripted, ScriptedTransport};
