use thiserror::Error;

/// Top-level error classes.
///
/// Only `Configuration` stops the node, and only during startup. Everything
/// else is logged by the task that hit it and the loop carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("i/o error: {0}")]
    TransientIo(#[from] IoError),
    #[error("actuator error: {0}")]
    Actuator(#[from] ActuatorError),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] TransportError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("failed to control the zero-crossing interrupt")]
    EdgeInterrupt,
    #[error("failed to set up the pulse timer")]
    PulseTimer,
    #[error("failed to set up peripheral: {0}")]
    Peripheral(&'static str),
    #[error("failed to spawn task: {0}")]
    Spawn(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum IoError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("sensor: {0}")]
    Sensor(#[from] SensorError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("no such file")]
    NotFound,
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("offset beyond end of file")]
    InvalidOffset,
    #[error("storage is unavailable")]
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("no sensor on channel {0}")]
    InvalidChannel(u8),
    #[error("sensor bus error")]
    Bus,
    #[error("sensor reported busy")]
    Busy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ActuatorError {
    #[error("failed to update the pwm duty")]
    Pwm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("the link refused the frame")]
    NotAccepted,
    #[error("the peer did not acknowledge the frame")]
    NotDelivered,
    #[error("frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport queue is full")]
    QueueFull,
    #[error("out of memory for the frame copy")]
    OutOfMemory,
}
