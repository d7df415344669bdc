//! Phase-angle control of the heater triac.
//!
//! Each mains half cycle starts at a zero crossing. To deliver `p`% of the
//! power, the triac gate is pulsed `(100 - p)`% of the way into the half
//! cycle; the triac then conducts until the next zero crossing.
//!
//! ```text
//!  zero crossing                          zero crossing
//!  |<------------- half cycle ------------->|
//!  |<----- fire_delay ----->|               |
//!  ________________________ _______________ _____
//!  gate                    |_|             |
//!                          pulse           conducts
//! ```
//!
//! At 0% and 100% no per-cycle work is needed: the edge interrupt is turned
//! off and the gate is held low or high.
//!
//! A deferred pulse takes two expiries of the pulse timer: the first raises
//! the gate and re-arms the timer for the trigger width, the second lowers
//! it. No handler waits on the pulse.
//!
//! All state lives behind one `critical_section::Mutex`, shared by the
//! zero-crossing interrupt, the pulse timer and whoever calls `set_power`.
//! Every critical section is a handful of assignments; the gate pulse itself
//! is timed outside of it.

use core::cell::RefCell;
use critical_section::Mutex;
use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

use crate::config::{GATE_PULSE, GATE_PULSE_US, NOMINAL_HALF_CYCLE};
use crate::error::ConfigurationError;

/// The board side of the controller: the gate output, the zero-crossing
/// input interrupt and a one-shot timer.
///
/// Every method is called with the controller's critical section held and
/// must return promptly.
pub trait TriacDriver {
    /// Drives the triac gate output.
    fn set_gate(&mut self, on: bool);

    /// Starts or stops listening for zero-crossing edges.
    fn set_edge_interrupt(&mut self, enabled: bool) -> Result<(), ConfigurationError>;

    /// Arranges for [`PhaseCut::on_pulse_timer`] to run once, `delay` from now.
    fn arm_pulse(&mut self, delay: Duration);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseControlState {
    pub power_percent: u16,
    /// `None` until an edge has been seen since the interrupt was enabled.
    pub last_edge: Option<Instant>,
    pub half_cycle: Duration,
    pub fire_delay: Duration,
    pub edge_interrupt_enabled: bool,
    /// The gate is up, waiting for the pulse timer to lower it.
    pub gate_pulse_active: bool,
}

impl PhaseControlState {
    const INITIAL: PhaseControlState = PhaseControlState {
        power_percent: 0,
        last_edge: None,
        half_cycle: NOMINAL_HALF_CYCLE,
        fire_delay: NOMINAL_HALF_CYCLE,
        edge_interrupt_enabled: false,
        gate_pulse_active: false,
    };
}

/// What the zero-crossing handler did with an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Only recorded: the half cycle can't be measured from a single edge.
    FirstEdge,
    /// Power is at 0%, nothing to fire.
    Off,
    /// Pulsed right away.
    Fired,
    /// A pulse was armed to fire after the given delay.
    Armed(Duration),
    /// The delay would land in the next half cycle. Skipped.
    OutOfRange,
}

/// What the pulse timer handler did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseStep {
    /// Gate raised, timer re-armed for the trigger width.
    Raised,
    /// Pulse over. The gate stays up only at 100%.
    Lowered,
    /// Armed before power moved to 0% or 100%. Nothing fired.
    Dropped,
}

pub struct PhaseCut<D> {
    inner: Mutex<RefCell<Inner<D>>>,
}

struct Inner<D> {
    state: PhaseControlState,
    driver: D,
}

impl<D: TriacDriver> PhaseCut<D> {
    /// Takes over the driver with the gate low and the edge interrupt off.
    pub fn init(mut driver: D) -> Result<Self, ConfigurationError> {
        driver.set_gate(false);
        driver.set_edge_interrupt(false)?;

        let phase_cut = PhaseCut {
            inner: Mutex::new(RefCell::new(Inner {
                state: PhaseControlState::INITIAL,
                driver,
            })),
        };
        phase_cut.set_power(0)?;

        Ok(phase_cut)
    }

    /// Sets the heater power. Values above 100 are clamped.
    ///
    /// Only fails if the edge interrupt can't be switched, which means the
    /// board is misconfigured.
    pub fn set_power(&self, percent: u16) -> Result<(), ConfigurationError> {
        let percent = percent.min(100);
        let phase_controlled = percent != 0 && percent != 100;

        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let Inner { state, driver } = &mut *inner;

            if phase_controlled != state.edge_interrupt_enabled {
                driver.set_edge_interrupt(phase_controlled)?;
                state.edge_interrupt_enabled = phase_controlled;

                if phase_controlled {
                    // The last edge seen is stale, measure afresh.
                    state.last_edge = None;
                    driver.set_gate(false);
                }
            }

            state.power_percent = percent;
            state.fire_delay = fire_delay(state.half_cycle, percent);

            match percent {
                100 => driver.set_gate(true),
                0 => driver.set_gate(false),
                _ => (),
            }

            Ok(())
        })
    }

    /// Zero-crossing interrupt handler. Never blocks, except for the gate
    /// pulse on the immediate-fire path.
    pub fn on_zero_crossing(&self, now: Instant, delay: &mut impl DelayNs) -> EdgeOutcome {
        let outcome = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let Inner { state, driver } = &mut *inner;

            // A pulse still up at the next crossing has done its job.
            if state.gate_pulse_active {
                state.gate_pulse_active = false;
                driver.set_gate(state.power_percent == 100);
            }

            let Some(previous_edge) = state.last_edge.replace(now) else {
                return EdgeOutcome::FirstEdge;
            };
            if let Some(spacing) = now.checked_duration_since(previous_edge) {
                state.half_cycle = spacing;
            }

            if state.power_percent == 0 {
                EdgeOutcome::Off
            } else if state.fire_delay == Duration::from_ticks(0) {
                EdgeOutcome::Fired
            } else if state.fire_delay < state.half_cycle {
                driver.arm_pulse(state.fire_delay);
                EdgeOutcome::Armed(state.fire_delay)
            } else {
                EdgeOutcome::OutOfRange
            }
        });

        if outcome == EdgeOutcome::Fired {
            self.fire_triac_pulse(delay);
        }

        outcome
    }

    /// Pulse timer handler, for pulses armed by [`Self::on_zero_crossing`].
    /// Never blocks.
    pub fn on_pulse_timer(&self) -> PulseStep {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let Inner { state, driver } = &mut *inner;

            if state.gate_pulse_active {
                state.gate_pulse_active = false;
                driver.set_gate(state.power_percent == 100);
                PulseStep::Lowered
            } else if state.edge_interrupt_enabled {
                state.gate_pulse_active = true;
                driver.set_gate(true);
                driver.arm_pulse(GATE_PULSE);
                PulseStep::Raised
            } else {
                PulseStep::Dropped
            }
        })
    }

    /// Raises the gate for the trigger width, then lowers it again (unless
    /// power went to 100% meanwhile). Only used on the immediate-fire path.
    pub fn fire_triac_pulse(&self, delay: &mut impl DelayNs) {
        self.with_driver(|driver| driver.set_gate(true));
        delay.delay_us(GATE_PULSE_US);

        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let hold = inner.state.power_percent == 100;
            inner.driver.set_gate(hold);
        });
    }

    pub fn state(&self) -> PhaseControlState {
        critical_section::with(|cs| self.inner.borrow_ref(cs).state)
    }

    /// Runs `f` on the driver inside the critical section, e.g. to
    /// acknowledge an interrupt.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs).driver))
    }
}

fn fire_delay(half_cycle: Duration, percent: u16) -> Duration {
    let off_percent = u64::from(100 - percent);
    Duration::from_micros(half_cycle.as_micros() * off_percent / 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Event {
        Gate(bool),
        EdgeInterrupt(bool),
        Armed(Duration),
    }

    #[derive(Default)]
    struct FakeTriac {
        events: Vec<Event>,
        gate: bool,
        fail_interrupt: bool,
    }

    impl TriacDriver for FakeTriac {
        fn set_gate(&mut self, on: bool) {
            self.gate = on;
            self.events.push(Event::Gate(on));
        }

        fn set_edge_interrupt(&mut self, enabled: bool) -> Result<(), ConfigurationError> {
            if self.fail_interrupt {
                return Err(ConfigurationError::EdgeInterrupt);
            }
            self.events.push(Event::EdgeInterrupt(enabled));
            Ok(())
        }

        fn arm_pulse(&mut self, delay: Duration) {
            self.events.push(Event::Armed(delay));
        }
    }

    #[derive(Default)]
    struct FakeDelay {
        waited_ns: u64,
    }

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.waited_ns += u64::from(ns);
        }
    }

    fn controller() -> PhaseCut<FakeTriac> {
        let phase_cut = PhaseCut::init(FakeTriac::default()).unwrap();
        phase_cut.with_driver(|driver| driver.events.clear());
        phase_cut
    }

    fn at_ms(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    #[test]
    fn init_holds_gate_low_with_interrupt_off() {
        let phase_cut = PhaseCut::init(FakeTriac::default()).unwrap();
        let state = phase_cut.state();

        assert_eq!(state.power_percent, 0);
        assert!(!state.edge_interrupt_enabled);
        assert_eq!(state.half_cycle, NOMINAL_HALF_CYCLE);
        assert!(phase_cut.with_driver(|driver| !driver.gate));
    }

    #[test]
    fn full_and_zero_power_hold_the_gate() {
        let phase_cut = controller();

        phase_cut.set_power(50).unwrap();
        phase_cut.set_power(100).unwrap();
        let state = phase_cut.state();
        assert!(!state.edge_interrupt_enabled);
        assert_eq!(state.fire_delay, Duration::from_ticks(0));
        assert!(phase_cut.with_driver(|driver| driver.gate));

        phase_cut.set_power(0).unwrap();
        assert!(!phase_cut.state().edge_interrupt_enabled);
        assert!(phase_cut.with_driver(|driver| !driver.gate));

        let events = phase_cut.with_driver(|driver| driver.events.clone());
        assert_eq!(
            events,
            [
                Event::EdgeInterrupt(true),
                Event::Gate(false),
                Event::EdgeInterrupt(false),
                Event::Gate(true),
                Event::Gate(false),
            ]
        );
    }

    #[test]
    fn partial_power_enables_interrupt_once() {
        let phase_cut = controller();
        phase_cut.set_power(30).unwrap();
        phase_cut.set_power(60).unwrap();

        let state = phase_cut.state();
        assert!(state.edge_interrupt_enabled);
        assert_eq!(state.fire_delay, Duration::from_micros(8_300 * 40 / 100));

        let enables = phase_cut.with_driver(|driver| {
            driver
                .events
                .iter()
                .filter(|event| **event == Event::EdgeInterrupt(true))
                .count()
        });
        assert_eq!(enables, 1);
    }

    #[test]
    fn out_of_range_percent_is_clamped() {
        let phase_cut = controller();
        phase_cut.set_power(1000).unwrap();
        assert_eq!(phase_cut.state().power_percent, 100);
    }

    #[test]
    fn interrupt_failure_leaves_state_untouched() {
        let phase_cut = controller();
        phase_cut.with_driver(|driver| driver.fail_interrupt = true);

        assert_eq!(phase_cut.set_power(50), Err(ConfigurationError::EdgeInterrupt));
        let state = phase_cut.state();
        assert_eq!(state.power_percent, 0);
        assert!(!state.edge_interrupt_enabled);
    }

    #[test]
    fn first_edge_only_measures() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(50).unwrap();

        assert_eq!(phase_cut.on_zero_crossing(at_ms(100), &mut delay), EdgeOutcome::FirstEdge);
        let state = phase_cut.state();
        assert_eq!(state.half_cycle, NOMINAL_HALF_CYCLE);
        assert_eq!(state.last_edge, Some(at_ms(100)));
        assert!(phase_cut.with_driver(|driver| !driver.events.iter().any(|e| matches!(e, Event::Armed(_)))));
    }

    #[test]
    fn second_edge_measures_half_cycle_and_arms() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(50).unwrap();

        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        let outcome = phase_cut.on_zero_crossing(at_ms(110), &mut delay);

        assert_eq!(phase_cut.state().half_cycle, Duration::from_millis(10));
        // The delay was computed from the nominal half cycle when power was set.
        assert_eq!(outcome, EdgeOutcome::Armed(Duration::from_micros(4_150)));
        assert_eq!(delay.waited_ns, 0);
    }

    #[test]
    fn delay_beyond_half_cycle_never_fires() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(10).unwrap();

        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        let outcome = phase_cut.on_zero_crossing(at_ms(105), &mut delay);

        assert_eq!(outcome, EdgeOutcome::OutOfRange);
        assert!(phase_cut.with_driver(|driver| !driver.events.iter().any(|e| matches!(e, Event::Armed(_)))));
    }

    #[test]
    fn zero_delay_fires_inline() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(100).unwrap();
        phase_cut.with_driver(|driver| driver.events.clear());

        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        let outcome = phase_cut.on_zero_crossing(at_ms(110), &mut delay);

        assert_eq!(outcome, EdgeOutcome::Fired);
        assert_eq!(delay.waited_ns, u64::from(GATE_PULSE_US) * 1_000);
        // At 100% the gate stays up after the pulse.
        let events = phase_cut.with_driver(|driver| driver.events.clone());
        assert_eq!(events, [Event::Gate(true), Event::Gate(true)]);
    }

    #[test]
    fn zero_power_edges_do_nothing() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();

        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        assert_eq!(phase_cut.on_zero_crossing(at_ms(110), &mut delay), EdgeOutcome::Off);
        assert!(phase_cut.with_driver(|driver| driver.events.is_empty()));
    }

    #[test]
    fn pulse_timer_raises_then_lowers_the_gate() {
        let phase_cut = controller();
        phase_cut.set_power(40).unwrap();
        phase_cut.with_driver(|driver| driver.events.clear());

        assert_eq!(phase_cut.on_pulse_timer(), PulseStep::Raised);
        assert!(phase_cut.state().gate_pulse_active);
        assert_eq!(phase_cut.on_pulse_timer(), PulseStep::Lowered);
        assert!(!phase_cut.state().gate_pulse_active);

        let events = phase_cut.with_driver(|driver| driver.events.clone());
        assert_eq!(
            events,
            [Event::Gate(true), Event::Armed(GATE_PULSE), Event::Gate(false)]
        );
    }

    #[test]
    fn stale_pulse_is_dropped_after_power_off() {
        let phase_cut = controller();
        phase_cut.set_power(40).unwrap();
        phase_cut.set_power(0).unwrap();
        phase_cut.with_driver(|driver| driver.events.clear());

        assert_eq!(phase_cut.on_pulse_timer(), PulseStep::Dropped);
        assert!(phase_cut.with_driver(|driver| driver.events.is_empty()));
    }

    #[test]
    fn pulse_ending_at_full_power_holds_the_gate() {
        let phase_cut = controller();
        phase_cut.set_power(40).unwrap();
        assert_eq!(phase_cut.on_pulse_timer(), PulseStep::Raised);

        phase_cut.set_power(100).unwrap();
        assert_eq!(phase_cut.on_pulse_timer(), PulseStep::Lowered);
        assert!(phase_cut.with_driver(|driver| driver.gate));
    }

    #[test]
    fn pulse_still_up_at_the_next_edge_is_ended() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(40).unwrap();
        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        phase_cut.on_pulse_timer();

        phase_cut.on_zero_crossing(at_ms(110), &mut delay);

        assert!(!phase_cut.state().gate_pulse_active);
        assert!(phase_cut.with_driver(|driver| !driver.gate));
    }

    #[test]
    fn reenabling_discards_the_stale_edge() {
        let phase_cut = controller();
        let mut delay = FakeDelay::default();
        phase_cut.set_power(50).unwrap();
        phase_cut.on_zero_crossing(at_ms(100), &mut delay);
        phase_cut.on_zero_crossing(at_ms(110), &mut delay);

        phase_cut.set_power(0).unwrap();
        phase_cut.set_power(50).unwrap();

        assert_eq!(phase_cut.state().last_edge, None);
        assert_eq!(phase_cut.on_zero_crossing(at_ms(5_000), &mut delay), EdgeOutcome::FirstEdge);
        assert_eq!(phase_cut.state().half_cycle, Duration::from_millis(10));
    }
}
