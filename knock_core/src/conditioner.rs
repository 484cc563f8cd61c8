//! Raw converter code to knock level.
//!
//! Analog output uses integer floor scaling, `raw * 255 / 1023`, which is
//! what the shield firmware's `map()` produced. With a threshold of 204 the
//! limit flips between raw 818 (output 203) and raw 819 (output 204).

/// Full-scale converter code.
pub const ADC_MAX: u16 = 1023;
/// Analog output level (about 80%) at and above which the limit LED lights.
pub const LIMIT_THRESHOLD: u8 = 204;

#[inline]
fn saturate(raw: u16) -> u16 {
    raw.min(ADC_MAX)
}

/// Knock level in percent, `raw / 1023 * 100`.
#[inline]
pub fn raw_to_percentage(raw: u16) -> f32 {
    f32::from(saturate(raw)) / f32::from(ADC_MAX) * 100.0
}

/// 8-bit analog output duty, `floor(raw * 255 / 1023)`.
#[inline]
pub fn raw_to_output(raw: u16) -> u8 {
    let scaled = u32::from(saturate(raw)) * 255 / u32::from(ADC_MAX);
    // saturate() bounds scaled to 255
    scaled as u8
}

#[inline]
pub fn is_limit_exceeded(output: u8) -> bool {
    output >= LIMIT_THRESHOLD
}

/// Output driven in two-channel mode: the louder channel wins.
#[inline]
pub fn combined_output(raw1: u16, raw2: u16) -> u8 {
    raw_to_output(raw1.max(raw2))
}

/// Integer percent shown to the operator (fraction truncated).
#[inline]
pub fn display_percent(percentage: f32) -> u32 {
    percentage.clamp(0.0, 100.0) as u32
}

/// One channel's reading for one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub channel_id: u8,
    pub raw_adc: u16,
    pub percentage: f32,
    pub analog_output: u8,
    pub limit_exceeded: bool,
}

impl Measurement {
    pub fn from_raw(channel_id: u8, raw: u16) -> Self {
        let raw_adc = saturate(raw);
        let analog_output = raw_to_output(raw_adc);
        Self {
            channel_id,
            raw_adc,
            percentage: raw_to_percentage(raw_adc),
            analog_output,
            limit_exceeded: is_limit_exceeded(analog_output),
        }
    }

    pub fn display_percent(&self) -> u32 {
        display_percent(self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false)]
    #[case(203, false)]
    #[case(204, true)]
    #[case(255, true)]
    fn limit_boundary(#[case] output: u8, #[case] expected: bool) {
        assert_eq!(is_limit_exceeded(output), expected);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(818, 203, 79)]
    #[case(819, 204, 80)]
    #[case(1023, 255, 100)]
    fn known_points(#[case] raw: u16, #[case] output: u8, #[case] pct: u32) {
        let m = Measurement::from_raw(1, raw);
        assert_eq!(m.analog_output, output);
        assert_eq!(m.display_percent(), pct);
        assert_eq!(m.limit_exceeded, output >= 204);
    }

    #[test]
    fn out_of_range_codes_saturate() {
        let m = Measurement::from_raw(2, 4095);
        assert_eq!(m.raw_adc, ADC_MAX);
        assert_eq!(m.analog_output, 255);
        assert_eq!(m.percentage, 100.0);
    }

    #[test]
    fn combined_uses_louder_channel() {
        assert_eq!(combined_output(100, 900), raw_to_output(900));
        assert_eq!(combined_output(900, 100), raw_to_output(900));
        assert_eq!(combined_output(512, 512), raw_to_output(512));
    }
}
