//! Tachometer frequency to shaft speed.

/// `rpm = freq_hz * 60 / gear_poles`, truncated.
///
/// A zero `gear_poles` reads as standstill rather than dividing by zero;
/// configuration validation rejects it before it can reach here.
#[inline]
pub const fn rpm_from_hz(freq_hz: u32, gear_poles: u32) -> u32 {
    if gear_poles == 0 {
        return 0;
    }
    let rpm = freq_hz as u64 * 60 / gear_poles as u64;
    if rpm > u32::MAX as u64 {
        u32::MAX
    } else {
        rpm as u32
    }
}
