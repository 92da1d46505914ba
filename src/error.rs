//! Error types for the gravity sprite pipeline.

use thiserror::Error;

/// Malformed entity data, detected before anything touches the GPU.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("entity {index} has a non-finite {field}")]
    NonFinite { index: usize, field: &'static str },

    #[error("{kinematic_records} kinematic records but {colour_records} colour records")]
    LengthMismatch {
        kinematic_records: usize,
        colour_records: usize,
    },

    #[error("buffer of {len} floats is not a whole number of {stride}-float records")]
    MisalignedBuffer { len: usize, stride: usize },

    #[error("simulation needs at least one entity")]
    Empty,
}

/// Resource allocation, device and presentation failures.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter: {0}")]
    AdapterUnavailable(String),

    #[error("failed to create device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface has no supported texture format")]
    NoSurfaceFormat,

    #[error("allocation of {label} failed: {message}")]
    Allocation { label: String, message: String },

    #[error("kinematic buffer length {len} is not a non-zero multiple of 24 bytes")]
    InvalidKinematicLength { len: u64 },

    #[error("binding {binding} expects a {expected}-byte buffer, got {actual} bytes")]
    BindingLengthMismatch {
        binding: u32,
        expected: u64,
        actual: u64,
    },

    #[error("device lost: {0}")]
    DeviceLost(String),

    #[error("surface texture unavailable: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("frame submission failed: {0}")]
    Submission(String),

    #[error("buffer readback failed: {0}")]
    Readback(String),
}

/// Problems with the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("frame scheduler has not been started")]
    SchedulerIdle,
}

impl Error {
    /// True when the device is gone and the whole pipeline must be rebuilt.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Error::Gpu(GpuError::DeviceLost(_)))
    }

    /// True for surface hiccups that only cost the current frame.
    pub fn is_skipped_frame(&self) -> bool {
        matches!(
            self,
            Error::Gpu(GpuError::Surface(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Timeout
            ))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
