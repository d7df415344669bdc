use alloc::boxed::Box;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel};
use embassy_time::{Duration, Timer};
use embedded_hal::digital::OutputPin;

use crate::config::ALERT_QUEUE_DEPTH;

pub type AlertChannel = channel::Channel<CriticalSectionRawMutex, AlertEvent, ALERT_QUEUE_DEPTH>;
pub type AlertReceiver =
    channel::Receiver<'static, CriticalSectionRawMutex, AlertEvent, ALERT_QUEUE_DEPTH>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertEvent {
    /// Turns the indicator off.
    Clear,
    /// The link reported a failed transmission.
    SendFailed,
    /// Startup failed; the node is not running.
    InitFailed,
    /// Startup completed; every task is running.
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlinkPattern {
    pub on: Duration,
    pub off: Duration,
    pub repeat: u32,
}

impl AlertEvent {
    pub const fn pattern(self) -> BlinkPattern {
        const fn blink(on_ms: u64, off_ms: u64, repeat: u32) -> BlinkPattern {
            BlinkPattern {
                on: Duration::from_millis(on_ms),
                off: Duration::from_millis(off_ms),
                repeat,
            }
        }

        match self {
            AlertEvent::Clear => blink(0, 0, 0),
            // Quick double blink.
            AlertEvent::SendFailed => blink(200, 200, 2),
            // Keeps blinking for over 16 minutes.
            AlertEvent::InitFailed => blink(500, 500, 1000),
            AlertEvent::Finished => blink(1000, 1000, 1),
        }
    }
}

/// Fire-and-forget handle for raising alerts. Safe to call from any task.
#[derive(Clone, Copy)]
pub struct Alerts {
    channel: &'static AlertChannel,
}

pub fn init() -> Alerts {
    Alerts {
        channel: Box::leak(Box::new(channel::Channel::new())),
    }
}

impl Alerts {
    /// Queues an alert. Dropped if the indicator is still busy with earlier ones.
    pub fn notify(&self, event: AlertEvent) -> bool {
        self.channel.try_send(event).is_ok()
    }

    pub fn receiver(&self) -> AlertReceiver {
        self.channel.receiver()
    }
}

/// Plays queued alerts on a status LED, one after another.
pub async fn indicator<P: OutputPin>(mut led: P, alerts: AlertReceiver) -> ! {
    // The LED is best-effort. A pin error just means a missed blink.
    let _ = led.set_low();

    loop {
        let event = alerts.receive().await;
        play(&mut led, event.pattern()).await;
    }
}

pub async fn play<P: OutputPin>(led: &mut P, pattern: BlinkPattern) {
    for _ in 0..pattern.repeat {
        let _ = led.set_high();
        Timer::after(pattern.on).await;
        let _ = led.set_low();
        Timer::after(pattern.off).await;
    }
}
