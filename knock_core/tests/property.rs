use knock_core::conditioner::{
    ADC_MAX, LIMIT_THRESHOLD, combined_output, display_percent, is_limit_exceeded,
    raw_to_output, raw_to_percentage,
};
use knock_core::{ChannelMode, CycleReport, Measurement};
use proptest::prelude::*;

proptest! {
    #[test]
    fn percentage_matches_formula(raw in 0u16..=ADC_MAX) {
        let pct = raw_to_percentage(raw);
        let expected = f32::from(raw) / 1023.0 * 100.0;
        prop_assert!((pct - expected).abs() < 1e-3);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn output_is_floor_scaled(raw in 0u16..=ADC_MAX) {
        let out = raw_to_output(raw);
        prop_assert_eq!(u32::from(out), u32::from(raw) * 255 / 1023);
    }

    #[test]
    fn mapping_is_monotonic(a in 0u16..=ADC_MAX, b in 0u16..=ADC_MAX) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(raw_to_output(lo) <= raw_to_output(hi));
        prop_assert!(raw_to_percentage(lo) <= raw_to_percentage(hi));
        prop_assert!(display_percent(raw_to_percentage(lo)) <= display_percent(raw_to_percentage(hi)));
    }

    #[test]
    fn out_of_range_codes_saturate(raw in (ADC_MAX + 1)..=u16::MAX) {
        prop_assert_eq!(raw_to_output(raw), 255);
        prop_assert_eq!(Measurement::from_raw(1, raw).raw_adc, ADC_MAX);
    }

    #[test]
    fn combined_output_follows_the_louder_channel(a in 0u16..=ADC_MAX, b in 0u16..=ADC_MAX) {
        let out = combined_output(a, b);
        prop_assert_eq!(out, raw_to_output(a.max(b)));
        prop_assert_eq!(combined_output(b, a), out);

        let report = CycleReport::new(
            ChannelMode::Dual,
            vec![Measurement::from_raw(1, a), Measurement::from_raw(2, b)],
            vec![],
        );
        prop_assert_eq!(report.output, out);
        prop_assert_eq!(report.limit, out >= LIMIT_THRESHOLD);
    }

    #[test]
    fn limit_flag_agrees_with_threshold(out in any::<u8>()) {
        prop_assert_eq!(is_limit_exceeded(out), out >= 204);
    }
}
