//! Fixed-size records exchanged with the peer.
//!
//! Neither record has a header or a length prefix. The length is implied by
//! the record type and both ends must agree on it exactly. Fields are
//! little-endian, matching the peer firmware's in-memory layout.

use crate::config::MAX_TEMPERATURE_CHANNELS;
use crate::error::{LinkError, SensorError};

/// Size of an encoded [`TelemetrySample`]: one `f32` per temperature channel plus humidity.
pub const TELEMETRY_FRAME_LEN: usize = (MAX_TEMPERATURE_CHANNELS + 1) * 4;
/// Size of an encoded [`ActuatorCommand`].
pub const COMMAND_FRAME_LEN: usize = 4;

/// One period's worth of sensor data.
///
/// Temperature channels are numbered from 1. Channels that were never read
/// report `0.0`, which is also what goes on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TelemetrySample {
    temperatures: [f32; MAX_TEMPERATURE_CHANNELS],
    humidity: f32,
}

impl TelemetrySample {
    pub fn set_temperature(&mut self, channel: u8, celsius: f32) -> Result<(), SensorError> {
        let slot = channel_slot(channel).ok_or(SensorError::InvalidChannel(channel))?;
        self.temperatures[slot] = celsius;
        Ok(())
    }

    pub fn temperature(&self, channel: u8) -> Option<f32> {
        channel_slot(channel).map(|slot| self.temperatures[slot])
    }

    pub fn temperatures(&self) -> &[f32; MAX_TEMPERATURE_CHANNELS] {
        &self.temperatures
    }

    pub fn set_humidity(&mut self, percent: f32) {
        self.humidity = percent;
    }

    pub fn humidity(&self) -> f32 {
        self.humidity
    }

    pub fn encode(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut frame = [0u8; TELEMETRY_FRAME_LEN];
        let values = self.temperatures.iter().chain(core::iter::once(&self.humidity));
        for (chunk, value) in frame.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        frame
    }

    /// Decodes a record the way the receiving peer does.
    pub fn decode(frame: &[u8]) -> Result<Self, LinkError> {
        if frame.len() != TELEMETRY_FRAME_LEN {
            return Err(LinkError::FrameSize {
                expected: TELEMETRY_FRAME_LEN,
                actual: frame.len(),
            });
        }

        let mut values = frame
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));

        let mut sample = TelemetrySample::default();
        for slot in sample.temperatures.iter_mut() {
            *slot = values.next().unwrap_or_default();
        }
        sample.humidity = values.next().unwrap_or_default();

        Ok(sample)
    }
}

fn channel_slot(channel: u8) -> Option<usize> {
    let slot = usize::from(channel).checked_sub(1)?;
    (slot < MAX_TEMPERATURE_CHANNELS).then_some(slot)
}

/// Setpoints sent by the peer. Values above 100 are clamped by the actuators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub resistance_percent: u16,
    pub humidifier_percent: u16,
}

impl ActuatorCommand {
    pub fn decode(frame: &[u8]) -> Result<Self, LinkError> {
        let &[r0, r1, h0, h1] = frame else {
            return Err(LinkError::FrameSize {
                expected: COMMAND_FRAME_LEN,
                actual: frame.len(),
            });
        };

        Ok(ActuatorCommand {
            resistance_percent: u16::from_le_bytes([r0, r1]),
            humidifier_percent: u16::from_le_bytes([h0, h1]),
        })
    }

    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let [r0, r1] = self.resistance_percent.to_le_bytes();
        let [h0, h1] = self.humidifier_percent.to_le_bytes();
        [r0, r1, h0, h1]
    }
}
