mod common;

use climate_node::{
    config::NOMINAL_HALF_CYCLE,
    humidifier::duty_for_percent,
    phase_cut::{EdgeOutcome, PhaseCut},
    wire::{ActuatorCommand, COMMAND_FRAME_LEN},
};
use common::{FakeTriac, NoDelay};
use embassy_time::{Duration, Instant};
use proptest::prelude::*;

proptest! {
    #[test]
    fn power_is_clamped_to_100(percent in any::<u16>()) {
        let phase_cut = PhaseCut::init(FakeTriac::default()).unwrap();
        phase_cut.set_power(percent).unwrap();

        let state = phase_cut.state();
        prop_assert_eq!(state.power_percent, percent.min(100));
        prop_assert!(state.fire_delay <= NOMINAL_HALF_CYCLE);
    }

    #[test]
    fn partial_power_is_phase_controlled(percent in 1u16..=99) {
        let phase_cut = PhaseCut::init(FakeTriac::default()).unwrap();
        phase_cut.set_power(percent).unwrap();

        let state = phase_cut.state();
        let expected = NOMINAL_HALF_CYCLE.as_micros() * u64::from(100 - percent) / 100;
        prop_assert!(state.edge_interrupt_enabled);
        prop_assert_eq!(state.fire_delay, Duration::from_micros(expected));
        prop_assert!(state.fire_delay < state.half_cycle);
        prop_assert!(phase_cut.with_driver(|driver| driver.edge_interrupt && !driver.gate));
    }

    #[test]
    fn pulses_are_only_armed_inside_the_half_cycle(
        percent in 1u16..=99,
        spacing_us in 4_000u64..12_000,
    ) {
        let phase_cut = PhaseCut::init(FakeTriac::default()).unwrap();
        phase_cut.set_power(percent).unwrap();
        let fire_delay = phase_cut.state().fire_delay;

        let start = Instant::from_secs(1);
        phase_cut.on_zero_crossing(start, &mut NoDelay);
        let outcome = phase_cut.on_zero_crossing(start + Duration::from_micros(spacing_us), &mut NoDelay);

        if fire_delay < Duration::from_micros(spacing_us) {
            prop_assert_eq!(outcome, EdgeOutcome::Armed(fire_delay));
            prop_assert_eq!(phase_cut.with_driver(|driver| driver.armed.clone()), vec![fire_delay]);
        } else {
            prop_assert_eq!(outcome, EdgeOutcome::OutOfRange);
            prop_assert!(phase_cut.with_driver(|driver| driver.armed.is_empty()));
        }
    }

    #[test]
    fn commands_of_any_other_length_are_rejected(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(bytes.len() != COMMAND_FRAME_LEN);
        prop_assert!(ActuatorCommand::decode(&bytes).is_err());
    }

    #[test]
    fn humidifier_duty_never_exceeds_full_scale(percent in any::<u16>(), bits in 1u8..=16) {
        let duty = duty_for_percent(percent, bits);
        let full_scale = 1u32 << bits;
        prop_assert!(duty <= full_scale);
        prop_assert_eq!(duty == full_scale, percent >= 100);
    }
}
