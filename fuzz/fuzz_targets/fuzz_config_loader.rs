#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = knock_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // a validated register table must always encode
        let spu = knock_core::SpuConfiguration::try_from(&cfg.spu);
        assert!(spu.is_ok(), "validated [spu] rejected: {spu:?}");
        let timing: knock_core::TimingCfg = (&cfg.timing).into();
        assert!(!timing.window.is_zero());
    }
});
