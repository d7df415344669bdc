use core::cell::Cell;
use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use esp_hal::{
    Blocking,
    delay::Delay,
    gpio::{Event, Input, Io, Level, Output},
    handler,
    interrupt::Priority,
    time,
    timer::OneShotTimer,
};

use climate_node::{
    error::ConfigurationError,
    phase_cut::{PhaseCut, TriacDriver},
};

// The controller the interrupt handlers work on, set once at boot.
static PHASE_CUT: Mutex<Cell<Option<&'static PhaseCut<BoardTriac>>>> =
    Mutex::new(Cell::new(None));

pub struct BoardTriac {
    gate: Output<'static>,
    zero_crossing: Input<'static>,
    pulse_timer: OneShotTimer<'static, Blocking>,
}

impl BoardTriac {
    /// Installs the zero-crossing and pulse timer handlers. Neither does
    /// anything until [`bind`] is called.
    pub fn new(
        gate: Output<'static>,
        zero_crossing: Input<'static>,
        mut pulse_timer: OneShotTimer<'static, Blocking>,
        io: &mut Io<'static>,
    ) -> Self {
        io.set_interrupt_handler(zero_crossing_handler);
        pulse_timer.set_interrupt_handler(pulse_timer_handler);
        pulse_timer.enable_interrupt(true);

        BoardTriac {
            gate,
            zero_crossing,
            pulse_timer,
        }
    }
}

impl TriacDriver for BoardTriac {
    fn set_gate(&mut self, on: bool) {
        self.gate.set_level(Level::from(on));
    }

    fn set_edge_interrupt(&mut self, enabled: bool) -> Result<(), ConfigurationError> {
        if enabled {
            self.zero_crossing.clear_interrupt();
            self.zero_crossing.listen(Event::RisingEdge);
        } else {
            self.zero_crossing.unlisten();
        }
        Ok(())
    }

    fn arm_pulse(&mut self, delay: Duration) {
        // If the timer refuses, this half cycle goes without a pulse.
        let _ = self
            .pulse_timer
            .schedule(time::Duration::from_micros(delay.as_micros()));
    }
}

/// Hands the controller to the interrupt handlers.
pub fn bind(phase_cut: &'static PhaseCut<BoardTriac>) {
    critical_section::with(|cs| PHASE_CUT.borrow(cs).set(Some(phase_cut)));
}

fn bound() -> Option<&'static PhaseCut<BoardTriac>> {
    critical_section::with(|cs| PHASE_CUT.borrow(cs).get())
}

// Above the pulse timer, so edge timestamps stay accurate.
#[handler(priority = Priority::Priority3)]
fn zero_crossing_handler() {
    let now = Instant::now();
    let Some(phase_cut) = bound() else {
        return;
    };

    let edge = phase_cut.with_driver(|driver| {
        let pending = driver.zero_crossing.is_interrupt_set();
        driver.zero_crossing.clear_interrupt();
        pending
    });
    if edge {
        phase_cut.on_zero_crossing(now, &mut Delay::new());
    }
}

#[handler(priority = Priority::Priority2)]
fn pulse_timer_handler() {
    let Some(phase_cut) = bound() else {
        return;
    };

    phase_cut.with_driver(|driver| driver.pulse_timer.clear_interrupt());
    phase_cut.on_pulse_timer();
}
