//! Ponderation of song automation by the hardware controls
//!
//! The song emits its own volume (CC7) and balance (CC8) automation. Before
//! reaching the synth those values are weighted by the physical slider or
//! knob, so a slider pulled to zero always silences its channel.

/// Highest 7-bit MIDI value
pub const MAX_VALUE: u8 = 127;

/// Knob position that leaves the song's balance untouched
pub const BALANCE_CENTER: u8 = 64;

/// Scale a volume automation value by the slider position.
///
/// `floor(slider / 127 * automation)`; inputs above 127 are clamped first.
pub fn adjust_volume(slider_position: u8, automation_value: u8) -> u8 {
    let position = slider_position.min(MAX_VALUE) as u32;
    let automation = automation_value.min(MAX_VALUE) as u32;
    // Integer form of the floor keeps 127 * v / 127 == v exact
    (position * automation / MAX_VALUE as u32) as u8
}

/// Offset a balance automation value by the knob's distance from center,
/// clamped to 0..=127.
pub fn adjust_balance(knob_position: u8, automation_value: u8) -> u8 {
    let offset = knob_position.min(MAX_VALUE) as i16 - BALANCE_CENTER as i16;
    (automation_value.min(MAX_VALUE) as i16 + offset).clamp(0, MAX_VALUE as i16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_volume_examples() {
        assert_eq!(adjust_volume(127, 100), 100);
        assert_eq!(adjust_volume(0, 100), 0);
        // 64 / 127 * 100 = 50.39
        assert_eq!(adjust_volume(64, 100), 50);
        assert_eq!(adjust_volume(127, 127), 127);
    }

    #[test]
    fn test_balance_examples() {
        assert_eq!(adjust_balance(64, 64), 64);
        assert_eq!(adjust_balance(0, 64), 0);
        assert_eq!(adjust_balance(127, 64), 127);
        assert_eq!(adjust_balance(127, 100), 127);
        assert_eq!(adjust_balance(0, 10), 0);
        assert_eq!(adjust_balance(70, 30), 36);
    }

    proptest! {
        #[test]
        fn full_slider_is_identity(v in 0u8..=127) {
            prop_assert_eq!(adjust_volume(127, v), v);
        }

        #[test]
        fn closed_slider_silences(v in 0u8..=127) {
            prop_assert_eq!(adjust_volume(0, v), 0);
        }

        #[test]
        fn volume_is_monotonic_in_position(p in 0u8..127, v in 0u8..=127) {
            prop_assert!(adjust_volume(p, v) <= adjust_volume(p + 1, v));
        }

        #[test]
        fn volume_never_exceeds_automation(p in 0u8..=127, v in 0u8..=127) {
            prop_assert!(adjust_volume(p, v) <= v);
        }

        #[test]
        fn centered_knob_is_identity(v in 0u8..=127) {
            prop_assert_eq!(adjust_balance(64, v), v);
        }

        #[test]
        fn balance_stays_in_range(p in any::<u8>(), v in any::<u8>()) {
            prop_assert!(adjust_balance(p, v) <= 127);
        }
    }
}
