//! Fake collaborators shared by the integration tests.
#![allow(dead_code)]

use climate_node::{
    error::{ActuatorError, ConfigurationError, LinkError, SensorError},
    humidifier::Humidifier,
    peer::PeerAddress,
    phase_cut::TriacDriver,
    sensor::{HumiditySensor, TemperatureReadings, TemperatureSensors},
    task::transport::WirelessLink,
};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;

#[derive(Default)]
pub struct FakeLink {
    pub frames: Vec<(PeerAddress, Vec<u8>)>,
    pub fail_with: Option<LinkError>,
}

impl WirelessLink for FakeLink {
    async fn send_frame(&mut self, peer: &PeerAddress, frame: &[u8]) -> Result<(), LinkError> {
        self.frames.push((*peer, frame.to_vec()));
        match self.fail_with {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct FakeTriac {
    pub gate: bool,
    pub edge_interrupt: bool,
    pub armed: Vec<Duration>,
}

impl TriacDriver for FakeTriac {
    fn set_gate(&mut self, on: bool) {
        self.gate = on;
    }

    fn set_edge_interrupt(&mut self, enabled: bool) -> Result<(), ConfigurationError> {
        self.edge_interrupt = enabled;
        Ok(())
    }

    fn arm_pulse(&mut self, delay: Duration) {
        self.armed.push(delay);
    }
}

#[derive(Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Each read pops the next scripted result; once empty, reads fail.
#[derive(Default)]
pub struct FakeTemperatures {
    pub script: Vec<Result<Vec<(u8, f32)>, SensorError>>,
}

impl FakeTemperatures {
    pub fn reading(readings: &[(u8, f32)]) -> Self {
        FakeTemperatures {
            script: vec![Ok(readings.to_vec())],
        }
    }
}

impl TemperatureSensors for FakeTemperatures {
    async fn read_all(&mut self) -> Result<TemperatureReadings, SensorError> {
        if self.script.is_empty() {
            return Err(SensorError::Bus);
        }
        let readings = self.script.remove(0)?;
        Ok(readings.into_iter().collect())
    }
}

/// Takes as long as a DS18B20 conversion, then reports `readings`.
pub struct SlowTemperatures {
    pub conversion: Duration,
    pub readings: Vec<(u8, f32)>,
}

impl TemperatureSensors for SlowTemperatures {
    async fn read_all(&mut self) -> Result<TemperatureReadings, SensorError> {
        Timer::after(self.conversion).await;
        Ok(self.readings.iter().copied().collect())
    }
}

#[derive(Default)]
pub struct FakeHumidity {
    pub script: Vec<Result<f32, SensorError>>,
}

impl FakeHumidity {
    pub fn reading(percent: f32) -> Self {
        FakeHumidity {
            script: vec![Ok(percent)],
        }
    }
}

impl HumiditySensor for FakeHumidity {
    async fn read(&mut self) -> Result<f32, SensorError> {
        if self.script.is_empty() {
            return Err(SensorError::Busy);
        }
        self.script.remove(0)
    }
}

#[derive(Default)]
pub struct FakeHumidifier {
    pub calls: Vec<u16>,
    pub applied_at: Vec<Instant>,
    pub fail: bool,
}

impl Humidifier for FakeHumidifier {
    fn set_power(&mut self, percent: u16) -> Result<(), ActuatorError> {
        self.calls.push(percent);
        self.applied_at.push(Instant::now());
        if self.fail {
            Err(ActuatorError::Pwm)
        } else {
            Ok(())
        }
    }
}
