pub mod aht1x;

use arrayvec::ArrayVec;

use crate::config::MAX_TEMPERATURE_CHANNELS;
use crate::error::SensorError;

/// A temperature per (1-based) channel, for the probes that answered.
pub type TemperatureReadings = ArrayVec<(u8, f32), MAX_TEMPERATURE_CHANNELS>;

#[allow(async_fn_in_trait)]
pub trait TemperatureSensors {
    async fn read_all(&mut self) -> Result<TemperatureReadings, SensorError>;
}

#[allow(async_fn_in_trait)]
pub trait HumiditySensor {
    /// Relative humidity, in percent.
    async fn read(&mut self) -> Result<f32, SensorError>;
}
