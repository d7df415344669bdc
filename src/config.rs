use embassy_time::Duration;

// How often a telemetry record is sampled and sent to the peer.
pub const TELEMETRY_PERIOD: Duration = Duration::from_secs(1);
// Upper bound on the orchestrator's wait, so the loop stays live even if
// neither the period nor a command fires.
pub const ORCHESTRATOR_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

// Transport queue, shared by outbound telemetry and inbound frames.
pub const TRANSPORT_QUEUE_DEPTH: usize = 5;
pub const TRANSPORT_POLL_TIMEOUT: Duration = Duration::from_millis(10);
// Decoded actuator commands waiting for the orchestrator.
pub const COMMAND_QUEUE_DEPTH: usize = 10;
pub const ALERT_QUEUE_DEPTH: usize = 4;

// A 60Hz half cycle. Replaced by the measured value after two edges.
pub const NOMINAL_HALF_CYCLE: Duration = Duration::from_micros(8_300);
// Triac gate trigger width.
pub const GATE_PULSE_US: u32 = 1_000;
pub const GATE_PULSE: Duration = Duration::from_micros(GATE_PULSE_US as u64);

pub const MAX_TEMPERATURE_CHANNELS: usize = 10;

pub const ESPNOW_CHANNEL: u8 = 1;
pub const STORAGE_ROOT: &str = "/storage";
pub const PEER_ADDRESS_FILE: &str = "espnow_addr.dat";
pub const PEER_ADDRESS_PATH: &str =
    const_format::concatcp!(STORAGE_ROOT, "/", PEER_ADDRESS_FILE);

pub const HUMIDIFIER_DUTY_RESOLUTION_BITS: u8 = 13;
pub const HUMIDIFIER_PWM_FREQUENCY_HZ: u32 = 1_000;

// In characters.
pub const MEMLOG_CAPACITY: usize = 480;

pub const BANNER: &str = const_format::formatcp!(
    "{} {}",
    env!("CARGO_PKG_NAME"),
    env!("CARGO_PKG_VERSION")
);
