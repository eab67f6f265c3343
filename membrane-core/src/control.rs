//! Linear control signals to electrode voltages.
//!
//! A controller works with signals in `[-1, 1]` that should move the mirror
//! linearly. Since the membrane responds to `v^2`, the drive voltage is
//! `sqrt(255^2 * (c + 1) / 2)`, which puts `c = -1` at 0 V and `c = 1` at full
//! drive.

use crate::forcing::MAX_VOLTAGE;

pub const CONTROL_MIN: f64 = -1.0;
pub const CONTROL_MAX: f64 = 1.0;

/// Clamps a control signal to the rails. NaN is treated as the neutral `0`.
pub fn clamp_control(c: f64) -> f64 {
    if c.is_nan() {
        return 0.0;
    }
    c.clamp(CONTROL_MIN, CONTROL_MAX)
}

pub fn control_to_voltage(c: f64) -> i32 {
    let full = (MAX_VOLTAGE * MAX_VOLTAGE) as f64;
    let v = (full * (clamp_control(c) + 1.0) * 0.5).sqrt().round() as i32;
    v.clamp(0, MAX_VOLTAGE)
}

pub fn voltages_from_controls(controls: &[f64]) -> Vec<i32> {
    let voltages: Vec<i32> = controls.iter().map(|&c| control_to_voltage(c)).collect();
    log::debug!("control voltages: {voltages:?}");
    voltages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rails_map_to_voltage_range() {
        assert_eq!(control_to_voltage(-1.0), 0);
        assert_eq!(control_to_voltage(1.0), 255);
        assert_eq!(control_to_voltage(3.5), 255);
        assert_eq!(control_to_voltage(-7.0), 0);
        // sqrt(65025 / 2) = 180.31
        assert_eq!(control_to_voltage(0.0), 180);
        assert_eq!(control_to_voltage(f64::NAN), 180);
    }

    #[test]
    fn squared_voltage_is_linear_in_control() {
        let full = 255.0f64 * 255.0;
        for k in 0..=20 {
            let c = -1.0 + k as f64 * 0.1;
            let v = control_to_voltage(c) as f64;
            let expected = full * (c + 1.0) * 0.5;
            // rounding to an integer voltage moves v^2 by at most ~v
            assert!((v * v - expected).abs() <= v + 1.0, "c={c} v={v}");
        }
    }

    #[test]
    fn maps_whole_vector() {
        assert_eq!(voltages_from_controls(&[-1.0, 1.0]), vec![0, 255]);
    }
}
