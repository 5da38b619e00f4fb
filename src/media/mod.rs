//! Media tooling
//!
//! Probing and remuxing run as external processes behind
//! [`process::CommandRunner`]; classification is pure.

pub mod aspect;
pub mod probe;
pub mod process;
pub mod remux;

pub use aspect::{classify, OrientationBucket};
pub use probe::{MediaProbe, ProbeError, ProbeResult};
pub use process::{CommandRunner, ProcessError, SystemCommandRunner};
pub use remux::{FastStartRemuxer, RemuxError, OUTPUT_CONTENT_TYPE};
