//! ESP32-S3 implementations of the library's collaborator traits.

pub mod espnow;
pub mod humidifier;
pub mod temperature;
pub mod triac;
