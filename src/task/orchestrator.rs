use alloc::format;
use embassy_futures::select::{Either, select};
use embassy_time::{Ticker, with_timeout};

use crate::{
    config::{ORCHESTRATOR_WAIT_TIMEOUT, TELEMETRY_PERIOD},
    error::TransportError,
    humidifier::Humidifier,
    memlog::SharedLogger,
    phase_cut::{PhaseCut, TriacDriver},
    sensor::{HumiditySensor, TemperatureSensors},
    task::transport::{CommandReceiver, Transport},
    wire::{ActuatorCommand, TelemetrySample},
};

/// Why an orchestrator iteration woke up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    Period,
    Command,
    Idle,
}

/// The control loop: sends telemetry every period and applies commands as
/// they arrive.
pub struct Orchestrator<'a, T, H, U, D> {
    sampler: Sampler<'a, T, H>,
    actuators: Actuators<'a, U, D>,
    commands: CommandReceiver,
}

// The send phase's half.
struct Sampler<'a, T, H> {
    temperature: T,
    humidity: H,
    transport: &'a Transport,
    memlog: SharedLogger,
    // Last known readings. A failed read leaves its fields as they were.
    sample: TelemetrySample,
}

// The command phase's half.
struct Actuators<'a, U, D> {
    humidifier: U,
    phase_cut: &'a PhaseCut<D>,
    memlog: SharedLogger,
}

impl<'a, T, H, U, D> Orchestrator<'a, T, H, U, D>
where
    T: TemperatureSensors,
    H: HumiditySensor,
    U: Humidifier,
    D: TriacDriver,
{
    pub fn new(
        temperature: T,
        humidity: H,
        humidifier: U,
        phase_cut: &'a PhaseCut<D>,
        transport: &'a Transport,
        commands: CommandReceiver,
        memlog: SharedLogger,
    ) -> Self {
        Orchestrator {
            sampler: Sampler {
                temperature,
                humidity,
                transport,
                memlog,
                sample: TelemetrySample::default(),
            },
            actuators: Actuators {
                humidifier,
                phase_cut,
                memlog,
            },
            commands,
        }
    }

    pub fn sample(&self) -> &TelemetrySample {
        &self.sampler.sample
    }

    pub fn humidifier(&self) -> &U {
        &self.actuators.humidifier
    }

    pub async fn run(mut self) -> ! {
        let mut ticker = Ticker::every(TELEMETRY_PERIOD);
        loop {
            self.step(&mut ticker).await;
        }
    }

    /// One pass of the loop: waits for the period or a command, bounded by
    /// [`ORCHESTRATOR_WAIT_TIMEOUT`], and handles whatever is ready.
    pub async fn step(&mut self, ticker: &mut Ticker) -> Wake {
        let woke = with_timeout(
            ORCHESTRATOR_WAIT_TIMEOUT,
            select(ticker.next(), self.commands.receive()),
        )
        .await;

        match woke {
            Ok(Either::First(())) => {
                let commands = self.commands;
                let actuators = &mut self.actuators;

                // Sensor reads can take most of a second. Commands keep being
                // applied meanwhile.
                let apply_commands = async {
                    loop {
                        let command = commands.receive().await;
                        actuators.apply(command);
                    }
                };
                // Failures are logged in send_phase, the next period goes ahead regardless.
                let _ = select(self.sampler.send_phase(), apply_commands).await;

                // Don't let a command wait a whole extra iteration.
                if let Ok(command) = self.commands.try_receive() {
                    self.actuators.apply(command);
                }
                Wake::Period
            }
            Ok(Either::Second(command)) => {
                self.actuators.apply(command);
                Wake::Command
            }
            Err(_timeout) => Wake::Idle,
        }
    }

    /// Samples every sensor and hands the record to the transport.
    pub async fn send_phase(&mut self) -> Result<(), TransportError> {
        self.sampler.send_phase().await
    }

    /// Applies both setpoints. A failure on one does not stop the other.
    pub fn apply_command(&mut self, command: ActuatorCommand) {
        self.actuators.apply(command);
    }
}

impl<T: TemperatureSensors, H: HumiditySensor> Sampler<'_, T, H> {
    async fn send_phase(&mut self) -> Result<(), TransportError> {
        match self.temperature.read_all().await {
            Ok(readings) => {
                for (channel, celsius) in readings {
                    if let Err(error) = self.sample.set_temperature(channel, celsius) {
                        self.memlog.warn(format!("ignoring temperature reading: {error}"));
                    }
                }
            }
            Err(error) => self
                .memlog
                .warn(format!("failed to read temperatures: {error}")),
        }

        match self.humidity.read().await {
            Ok(humidity) => self.sample.set_humidity(humidity),
            Err(error) => self.memlog.warn(format!("failed to read humidity: {error}")),
        }

        let frame = self.sample.encode();
        self.transport.send(&frame).inspect_err(|error| {
            self.memlog
                .error(format!("failed to queue telemetry: {error}"));
        })
    }
}

impl<U: Humidifier, D: TriacDriver> Actuators<'_, U, D> {
    fn apply(&mut self, command: ActuatorCommand) {
        if let Err(error) = self.phase_cut.set_power(command.resistance_percent) {
            self.memlog.error(format!(
                "failed to set heater to {}%: {error}",
                command.resistance_percent
            ));
        }

        if let Err(error) = self.humidifier.set_power(command.humidifier_percent) {
            self.memlog.error(format!(
                "failed to set humidifier to {}%: {error}",
                command.humidifier_percent
            ));
        }
    }
}
