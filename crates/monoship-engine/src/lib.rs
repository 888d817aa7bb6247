pub mod client;
pub mod docker;
pub mod executor;
pub mod gates;

pub use client::{
    BuildError, CheckResult, DockerClient, DoctorReport, ImageId, PublishError, ServeError,
};
pub use executor::{DockerExecutor, RealExecutor};
pub use gates::{Gate, GateError, GateOutcome, GateOutputs, QualityGateRunner, VerifyReport};
