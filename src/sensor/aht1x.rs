//! AHT10/AHT15 humidity sensor on I2C.

use embassy_time::{Duration, Timer};
use embedded_hal::i2c::I2c;

use super::HumiditySensor;
use crate::error::SensorError;

const ADDRESS: u8 = 0x38;
const CMD_CALIBRATE: [u8; 3] = [0xE1, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];
const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;
// Datasheet says >75ms.
const MEASUREMENT_TIME: Duration = Duration::from_millis(80);
const FULL_SCALE: f32 = (1u32 << 20) as f32;

pub struct Aht1x<I> {
    i2c: I,
}

impl<I: I2c> Aht1x<I> {
    /// Loads the calibration coefficients. Returns the driver and whether
    /// the sensor reports itself calibrated.
    pub fn init(mut i2c: I) -> Result<(Self, bool), SensorError> {
        i2c.write(ADDRESS, &CMD_CALIBRATE)
            .map_err(|_| SensorError::Bus)?;

        let mut status = [0u8; 1];
        i2c.read(ADDRESS, &mut status)
            .map_err(|_| SensorError::Bus)?;

        Ok((Aht1x { i2c }, status[0] & STATUS_CALIBRATED != 0))
    }
}

impl<I: I2c> HumiditySensor for Aht1x<I> {
    async fn read(&mut self) -> Result<f32, SensorError> {
        self.i2c
            .write(ADDRESS, &CMD_TRIGGER)
            .map_err(|_| SensorError::Bus)?;
        Timer::after(MEASUREMENT_TIME).await;

        let mut raw = [0u8; 6];
        self.i2c
            .read(ADDRESS, &mut raw)
            .map_err(|_| SensorError::Bus)?;
        if raw[0] & STATUS_BUSY != 0 {
            return Err(SensorError::Busy);
        }

        // 20 bits of humidity, followed by 20 bits of temperature.
        let humidity = (u32::from(raw[1]) << 12) | (u32::from(raw[2]) << 4) | (u32::from(raw[3]) >> 4);
        Ok(humidity as f32 * 100.0 / FULL_SCALE)
    }
}
