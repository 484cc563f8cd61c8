#![no_main]
use knock_core::{ChannelMode, CycleReport, LIMIT_THRESHOLD, Measurement};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|codes: (u16, u16)| {
    let (a, b) = codes;
    let report = CycleReport::new(
        ChannelMode::Dual,
        vec![Measurement::from_raw(1, a), Measurement::from_raw(2, b)],
        vec![],
    );
    let louder = report.measurements[0].analog_output.max(report.measurements[1].analog_output);
    assert_eq!(report.output, louder);
    assert_eq!(report.limit, report.output >= LIMIT_THRESHOLD);
    assert!(report.line.starts_with("Channel 1: ") && report.line.ends_with('%'));
});
