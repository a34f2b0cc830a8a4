//! Chair-motion helpers layered on the AO engine.

use daq_hal::AnalogOutput;

/// One LSB of drift compensation, added whenever the chair has drifted more
/// than 0.05° from where it was expected to be.
const DRIFT_DEADBAND_DEG: f64 = 0.05;

/// The six-step piecewise-constant velocity thresholds used by
/// [`settle_chair`], in descending order, paired with a velocity magnitude
/// (deg/s) to drive toward zero. The dead band below the last threshold
/// stops the chair entirely.
const SETTLE_STEPS: [(f64, f64); 6] = [
    (25.0, 120.0),
    (12.5, 60.0),
    (2.5, 30.0),
    (1.25, 15.0),
    (0.25, 5.0),
    (0.125, 1.0),
];
const SETTLE_DEADBAND_DEG: f64 = 0.05;

/// Calibrated conversion factor from chair velocity (deg/s) to one DAC LSB,
/// specific to the rig's velocity-to-voltage scaling. Exposed so a caller
/// (or a future calibration routine) can override it.
#[derive(Debug, Clone, Copy)]
pub struct ChairCalibration {
    pub volts_per_deg_per_sec: f64,
    pub channel: i32,
}

impl Default for ChairCalibration {
    fn default() -> Self {
        ChairCalibration {
            volts_per_deg_per_sec: 10.0 / 300.0,
            channel: 0,
        }
    }
}

/// Converts a requested chair velocity to volts and writes it to the AO
/// channel, adding a one-LSB drift-compensation term whenever the current
/// position has drifted more than 0.05° from the expected position (§4.2).
pub fn update_chair(
    ao: &mut dyn AnalogOutput,
    cal: ChairCalibration,
    vel_deg_per_sec: f64,
    curr_pos_deg: f64,
    expected_pos_deg: f64,
) -> daq_hal::Result<()> {
    let mut volts = vel_deg_per_sec * cal.volts_per_deg_per_sec;
    if (curr_pos_deg - expected_pos_deg).abs() > DRIFT_DEADBAND_DEG {
        let lsb = 20.0 / 65536.0; // one LSB at 16 bits over the ±10V range
        volts += if curr_pos_deg > expected_pos_deg {
            -lsb
        } else {
            lsb
        };
    }
    ao.out_volts(cal.channel, volts)
}

/// Drives the chair toward zero using the six-step piecewise-constant
/// velocity schedule from §4.2, returning the velocity (deg/s, signed toward
/// zero) that should be applied this tick. Returns `None` once the chair is
/// within the dead band and should be stopped.
pub fn settle_chair_velocity(curr_pos_deg: f64) -> Option<f64> {
    let mag = curr_pos_deg.abs();
    if mag < SETTLE_DEADBAND_DEG {
        return None;
    }
    let sign = if curr_pos_deg > 0.0 { -1.0 } else { 1.0 };
    for (threshold, speed) in SETTLE_STEPS {
        if mag >= threshold {
            return Some(sign * speed);
        }
    }
    // Below the smallest threshold but still outside the dead band: use the
    // slowest step.
    Some(sign * SETTLE_STEPS.last().unwrap().1)
}

pub fn settle_chair(
    ao: &mut dyn AnalogOutput,
    cal: ChairCalibration,
    curr_pos_deg: f64,
) -> daq_hal::Result<()> {
    match settle_chair_velocity(curr_pos_deg) {
        Some(vel) => ao.out_volts(cal.channel, vel * cal.volts_per_deg_per_sec),
        None => ao.out_volts(cal.channel, 0.0),
    }
}

/// Writes zero to all AO channels (§4.2 `initChair`).
pub fn init_chair(ao: &mut dyn AnalogOutput) -> daq_hal::Result<()> {
    ao.out_volts(-1, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_chair_velocity_decreases_with_position() {
        assert_eq!(settle_chair_velocity(0.0), None);
        assert_eq!(settle_chair_velocity(0.04), None);
        assert_eq!(settle_chair_velocity(30.0), Some(-120.0));
        assert_eq!(settle_chair_velocity(-30.0), Some(120.0));
        assert_eq!(settle_chair_velocity(1.0), Some(-5.0));
        assert_eq!(settle_chair_velocity(0.2), Some(-1.0));
    }
}
