use embassy_time::{Duration, Timer};
use esp_ds18b20::{Ds18b20, Resolution};
use esp_hal::gpio;
use esp_onewire::OneWireBus;

use climate_node::{
    error::SensorError,
    sensor::{TemperatureReadings, TemperatureSensors},
};

// The probe wired to channel 1.
const PROBE_ADDRESS: u64 = 0x545A7B480B646128;
const PROBE_CHANNEL: u8 = 1;

pub struct Ds18b20Probe {
    sensor: Ds18b20<'static>,
}

impl Ds18b20Probe {
    pub fn new(onewire_pin: gpio::AnyPin<'static>) -> Result<Self, SensorError> {
        let onewire_bus = OneWireBus::new(onewire_pin);
        let sensor = Ds18b20::new(PROBE_ADDRESS, onewire_bus).map_err(|_| SensorError::Bus)?;
        Ok(Ds18b20Probe { sensor })
    }
}

impl TemperatureSensors for Ds18b20Probe {
    async fn read_all(&mut self) -> Result<TemperatureReadings, SensorError> {
        self.sensor
            .start_temp_measurement()
            .map_err(|_| SensorError::Bus)?;

        // 12bit resolution is the default, expects a 750ms wait time.
        let wait_time_ms = Resolution::Bits12.measurement_time_ms();
        Timer::after(Duration::from_millis(wait_time_ms as u64)).await;

        let data = self
            .sensor
            .read_sensor_data()
            .map_err(|_| SensorError::Bus)?;

        let mut readings = TemperatureReadings::new();
        readings.push((PROBE_CHANNEL, data.temperature));
        Ok(readings)
    }
}
