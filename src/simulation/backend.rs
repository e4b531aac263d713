//! Compute backend selection
//!
//! The engine recognizes four backend tags. Hosts address them by the string
//! tags `single`, `openmp`, `cuda`, `opengl`; anything else is rejected at
//! parse time. The two GPU backends are dispatch targets only: when their
//! kernels are not built in, `step` logs a warning and runs the threaded CPU
//! path instead.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown backend: {0}")]
pub struct UnknownBackendError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    /// Everything on the calling thread.
    CpuSingleThread,
    /// Per-particle force/integration loops scattered across worker threads.
    /// Addressed by the tag `openmp` for host compatibility.
    CpuParallel,
    /// Device kernels; falls back to `CpuParallel` when not built in.
    Cuda,
    /// Graphics compute path; falls back to `CpuParallel` when not built in.
    OpenGlCompute,
}

impl ComputeBackend {
    /// The host-visible tag for this backend.
    pub fn tag(&self) -> &'static str {
        match self {
            ComputeBackend::CpuSingleThread => "single",
            ComputeBackend::CpuParallel => "openmp",
            ComputeBackend::Cuda => "cuda",
            ComputeBackend::OpenGlCompute => "opengl",
        }
    }
}

impl Default for ComputeBackend {
    fn default() -> Self {
        ComputeBackend::CpuParallel
    }
}

impl FromStr for ComputeBackend {
    type Err = UnknownBackendError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "single" => Ok(ComputeBackend::CpuSingleThread),
            "openmp" => Ok(ComputeBackend::CpuParallel),
            "cuda" => Ok(ComputeBackend::Cuda),
            "opengl" => Ok(ComputeBackend::OpenGlCompute),
            other => Err(UnknownBackendError(other.to_string())),
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
