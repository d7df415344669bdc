#![no_std]
#![no_main]
#![feature(impl_trait_in_assoc_type)]

use alloc::{boxed::Box, format};
use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::{
    Blocking,
    clock::CpuClock,
    gpio::{self, Input, InputConfig, Io, Output, OutputConfig},
    i2c::master::{self as i2c, I2c},
    time::Rate,
    timer::{OneShotTimer, systimer::SystemTimer, timg::TimerGroup},
};
use esp_wifi::esp_now::EspNowReceiver;

use climate_node::{
    config::{BANNER, MEMLOG_CAPACITY},
    error::{ConfigurationError, Error, IoError},
    memlog::{self, SharedLogger},
    peer::PeerAddress,
    phase_cut::PhaseCut,
    sensor::aht1x::Aht1x,
    storage::MemStorage,
    task::{
        Orchestrator, Transport,
        alert::{self, AlertEvent, AlertReceiver},
        transport::{self, CommandSender},
    },
};

extern crate alloc;

mod board;

use board::{
    espnow::EspNowLink, humidifier::LedcHumidifier, temperature::Ds18b20Probe, triac::BoardTriac,
};

type BoardOrchestrator =
    Orchestrator<'static, Ds18b20Probe, Aht1x<I2c<'static, Blocking>>, LedcHumidifier, BoardTriac>;

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::_160MHz);
    let peripherals = esp_hal::init(config);
    esp_alloc::heap_allocator!(size: 72 * 1024);
    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);
    let rng = esp_hal::rng::Rng::new(peripherals.RNG);
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    let mut io = Io::new(peripherals.IO_MUX);

    //
    // ESP32-S3 DevKit pinout
    //
    let output_5ma = OutputConfig::default()
        .with_drive_strength(gpio::DriveStrength::_5mA)
        .with_drive_mode(gpio::DriveMode::PushPull)
        .with_pull(gpio::Pull::None);
    // G48 is the status LED.
    let pin_alert_led = Output::new(peripherals.GPIO48, gpio::Level::Low, OutputConfig::default());
    // G4 is the 1Wire bus for the DS18B20 probes.
    let pin_sensor_temp = peripherals.GPIO4;
    // G8/G9 are the I2C bus for the AHT1x humidity sensor.
    let pin_i2c_sda = peripherals.GPIO8;
    let pin_i2c_scl = peripherals.GPIO9;
    // G10 drives the humidifier through a MOSFET.
    let pin_humidifier = peripherals.GPIO10;
    // G15 reads the optocoupled zero-crossing detector, rising edge at each crossing.
    let pin_zero_crossing =
        Input::new(peripherals.GPIO15, InputConfig::default().with_pull(gpio::Pull::None));
    // G16 drives the triac gate through an optotriac.
    let pin_triac_gate = Output::new(peripherals.GPIO16, gpio::Level::Low, output_5ma);

    let memlog = memlog::init(MEMLOG_CAPACITY);
    memlog.enable_print();
    memlog.info(BANNER);

    // Bring up the indicator first, so a failed boot can still be reported.
    let alerts = alert::init();
    if spawner
        .spawn(alert_indicator(pin_alert_led, alerts.receiver()))
        .is_err()
    {
        memlog.error("failed to spawn the alert indicator");
        return;
    }

    let boot = || -> Result<(), Error> {
        // No filesystem is mounted on this board, so the peer falls back to broadcast.
        let mut storage = MemStorage::new();
        let peer = PeerAddress::load(&mut storage, memlog);

        let temperature = Ds18b20Probe::new(pin_sensor_temp.into()).map_err(IoError::from)?;

        let i2c_bus = I2c::new(
            peripherals.I2C0,
            i2c::Config::default().with_frequency(Rate::from_khz(100)),
        )
            .map_err(|_| ConfigurationError::Peripheral("i2c"))?
            .with_sda(pin_i2c_sda)
            .with_scl(pin_i2c_scl);
        let (humidity, calibrated) = Aht1x::init(i2c_bus).map_err(IoError::from)?;
        if !calibrated {
            memlog.warn("humidity sensor is not calibrated");
        }

        let humidifier = LedcHumidifier::new(peripherals.LEDC, pin_humidifier.into())?;

        let triac = BoardTriac::new(
            pin_triac_gate,
            pin_zero_crossing,
            OneShotTimer::new(timg1.timer0),
            &mut io,
        );
        let phase_cut: &'static PhaseCut<BoardTriac> = Box::leak(Box::new(PhaseCut::init(triac)?));
        board::triac::bind(phase_cut);

        let (link, receiver) = board::espnow::init(
            timg0.timer0,
            rng,
            peripherals.RADIO_CLK,
            peripherals.WIFI,
            peer,
        )?;

        let transport = transport::init(peer, alerts);
        let commands = transport::init_commands();

        spawner
            .spawn(espnow_receiver(receiver, transport))
            .map_err(|_| ConfigurationError::Spawn("espnow receiver"))?;
        spawner
            .spawn(transport_worker(transport, link, commands.sender(), memlog))
            .map_err(|_| ConfigurationError::Spawn("transport worker"))?;

        let orchestrator = Orchestrator::new(
            temperature,
            humidity,
            humidifier,
            phase_cut,
            transport,
            commands.receiver(),
            memlog,
        );
        spawner
            .spawn(orchestrator_loop(orchestrator))
            .map_err(|_| ConfigurationError::Spawn("orchestrator"))?;

        Ok(())
    };

    match boot() {
        Ok(()) => {
            memlog.info("node running");
            alerts.notify(AlertEvent::Finished);
        }
        Err(error) => {
            memlog.error(format!("startup failed: {error}"));
            alerts.notify(AlertEvent::InitFailed);
        }
    }
}

#[embassy_executor::task]
async fn alert_indicator(led: Output<'static>, alerts: AlertReceiver) {
    alert::indicator(led, alerts).await
}

/// Feeds received frames into the transport queue.
#[embassy_executor::task]
async fn espnow_receiver(mut receiver: EspNowReceiver<'static>, transport: &'static Transport) {
    loop {
        let received = receiver.receive_async().await;
        transport.on_frame_received(received.data());
    }
}

#[embassy_executor::task]
async fn transport_worker(
    transport: &'static Transport,
    mut link: EspNowLink,
    commands: CommandSender,
    memlog: SharedLogger,
) {
    transport.run(&mut link, commands, memlog).await
}

#[embassy_executor::task]
async fn orchestrator_loop(orchestrator: BoardOrchestrator) {
    orchestrator.run().await
}
