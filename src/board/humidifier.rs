use alloc::boxed::Box;
use esp_hal::{
    gpio::AnyPin,
    ledc::{
        LSGlobalClkSource, Ledc, LowSpeed,
        channel::{self, ChannelHW, ChannelIFace},
        timer::{self, TimerIFace},
    },
    peripherals::LEDC,
    time::Rate,
};

use climate_node::{
    config::{HUMIDIFIER_DUTY_RESOLUTION_BITS, HUMIDIFIER_PWM_FREQUENCY_HZ},
    error::{ActuatorError, ConfigurationError},
    humidifier::{Humidifier, duty_for_percent},
};

pub struct LedcHumidifier {
    channel: channel::Channel<'static, LowSpeed>,
}

impl LedcHumidifier {
    /// Sets up a low-speed LEDC timer and channel on `pin`, output off.
    pub fn new(ledc: LEDC<'static>, pin: AnyPin<'static>) -> Result<Self, ConfigurationError> {
        let ledc = Box::leak(Box::new(Ledc::new(ledc)));
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let pwm_timer = Box::leak(Box::new(ledc.timer::<LowSpeed>(timer::Number::Timer0)));
        pwm_timer
            .configure(timer::config::Config {
                // Matches HUMIDIFIER_DUTY_RESOLUTION_BITS.
                duty: timer::config::Duty::Duty13Bit,
                clock_source: timer::LSClockSource::APBClk,
                frequency: Rate::from_hz(HUMIDIFIER_PWM_FREQUENCY_HZ),
            })
            .map_err(|_| ConfigurationError::Peripheral("humidifier pwm timer"))?;

        let mut channel = ledc.channel(channel::Number::Channel0, pin);
        channel
            .configure(channel::config::Config {
                timer: &*pwm_timer,
                duty_pct: 0,
                pin_config: channel::config::PinConfig::PushPull,
            })
            .map_err(|_| ConfigurationError::Peripheral("humidifier pwm channel"))?;

        Ok(LedcHumidifier { channel })
    }
}

impl Humidifier for LedcHumidifier {
    fn set_power(&mut self, percent: u16) -> Result<(), ActuatorError> {
        let duty = duty_for_percent(percent, HUMIDIFIER_DUTY_RESOLUTION_BITS);
        self.channel.set_duty_hw(duty);
        Ok(())
    }
}
