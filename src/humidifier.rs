use crate::error::ActuatorError;

/// The PWM-driven humidifier.
pub trait Humidifier {
    /// Sets the humidifier output. Percentages above 100 are clamped.
    fn set_power(&mut self, percent: u16) -> Result<(), ActuatorError>;
}

/// Converts a power percentage into a raw PWM duty for a timer with
/// `resolution_bits` of resolution. 100% maps to `2^resolution_bits`,
/// which the LEDC peripheral treats as fully on.
pub fn duty_for_percent(percent: u16, resolution_bits: u8) -> u32 {
    let percent = u32::from(percent.min(100));
    let full_scale = 1u32 << resolution_bits;
    full_scale * percent / 100
}
