//! Backend assembly, config mapping, and the `run` / `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use knock_core::util::cycle_rate_hz;
use knock_core::{
    ChannelMode, KnockMonitor, MonitorBuilder, RunParams, RunSummary, SpuConfiguration, TimingCfg,
};

use crate::cli::{JSON_MODE, RtLock};
use crate::rt::setup_rt_once;

/// `"a,b"` fixed ADC codes for the simulated shield (one value sets both).
pub const SIM_RAW_ENV: &str = "KNOCK_TEST_SIM_RAW";

#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    pub cycles: Option<u64>,
    pub stats: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: Option<RtLock>,
    pub rt_cpu: Option<usize>,
}

fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

/// Register table, timing, channel mode and storage from the TOML config.
fn apply_config(builder: MonitorBuilder, cfg: &knock_config::Config) -> eyre::Result<MonitorBuilder> {
    let registers = SpuConfiguration::try_from(&cfg.spu)?;
    let timing: TimingCfg = (&cfg.timing).into();
    let mode: ChannelMode = (&cfg.spu).into();
    let mut builder = builder
        .with_registers(registers)
        .with_timing(timing)
        .with_mode(mode);
    if let Some(path) = &cfg.storage.log_path {
        builder = builder.with_log_path(path);
    }
    Ok(builder)
}

#[cfg(feature = "hardware")]
fn build_monitor(cfg: &knock_config::Config) -> eyre::Result<KnockMonitor> {
    use knock_hardware::hardware::{GpioLine, PwmOutput, SpuBus, open_gpio, slave_select, spi_bus};
    use knock_hardware::mcp3008::Mcp3008;

    let gpio = open_gpio()?;
    let pins = &cfg.pins;
    let bus = SpuBus::open(
        cfg.spi.bus,
        cfg.spi.slave_select,
        cfg.spi.clock_hz,
        cfg.spi.mode,
        cfg.spi.lsb_first,
        cfg.spi.reassert_mode,
    )
    .wrap_err("open spu bus")?;
    let adc = Mcp3008::new(
        spi_bus(cfg.adc.bus)?,
        slave_select(cfg.adc.slave_select)?,
        cfg.adc.clock_hz,
        cfg.adc.channel,
    )
    .wrap_err("open mcp3008")?;
    let open = |pin: u8, high: bool, name: &str| {
        GpioLine::open(&gpio, pin, high).wrap_err_with(|| format!("open {name} pin {pin}"))
    };

    let mut builder = KnockMonitor::builder()
        .with_bus(bus)
        .with_select(open(pins.spu_cs, true, "spu_cs")?)
        .with_hold(open(pins.hold, false, "hold")?)
        .with_adc(adc)
        .with_status_led(open(pins.status_led, false, "status_led")?)
        .with_limit_led(open(pins.limit_led, false, "limit_led")?)
        .with_analog_output(
            PwmOutput::open(cfg.pwm.channel, cfg.pwm.frequency_hz).wrap_err("open pwm")?,
        );
    if let Some(test) = pins.test {
        builder = builder.with_test_pin(open(test, false, "test")?);
    }
    apply_config(builder, cfg)?.build()
}

#[cfg(not(feature = "hardware"))]
fn build_monitor(cfg: &knock_config::Config) -> eyre::Result<KnockMonitor> {
    let shield = sim_shield()?;
    tracing::warn!("hardware feature disabled; using the simulated shield");
    let builder = KnockMonitor::builder()
        .with_bus(shield.bus())
        .with_select(shield.line("spu_cs"))
        .with_hold(shield.line("hold"))
        .with_test_pin(shield.line("test"))
        .with_adc(shield.adc())
        .with_status_led(shield.line("status_led"))
        .with_limit_led(shield.line("limit_led"))
        .with_analog_output(shield.pwm());
    apply_config(builder, cfg)?.build()
}

#[cfg(not(feature = "hardware"))]
fn sim_shield() -> eyre::Result<knock_hardware::SimShield> {
    use knock_hardware::SimShield;
    match std::env::var(SIM_RAW_ENV) {
        Ok(v) => {
            let (ch1, ch2) = parse_sim_levels(&v)?;
            Ok(SimShield::new(ch1, ch2))
        }
        // a slow sweep so an interactive sim run shows movement
        Err(_) => Ok(SimShield::new(0, 512).with_sweep(37)),
    }
}

#[cfg_attr(feature = "hardware", allow(dead_code))]
fn parse_sim_levels(v: &str) -> eyre::Result<(u16, u16)> {
    let level = |s: &str| {
        s.trim()
            .parse::<u16>()
            .wrap_err_with(|| format!("{SIM_RAW_ENV}: bad ADC code {s:?}"))
    };
    match v.split_once(',') {
        Some((a, b)) => Ok((level(a)?, level(b)?)),
        None => {
            let a = level(v)?;
            Ok((a, a))
        }
    }
}

fn print_stats(summary: &RunSummary, timing: &TimingCfg, mode: ChannelMode) {
    let w = &summary.windows;
    let rate = cycle_rate_hz(timing, mode.channels().len());
    if json_mode() {
        let obj = serde_json::json!({
            "cycles": summary.cycles,
            "failed_cycles": summary.failed_cycles,
            "windows": w.count,
            "window_us": {
                "target": knock_core::util::duration_us(timing.window),
                "min": w.min_us,
                "mean": w.mean_us(),
                "max": w.max_us,
                "stdev": w.stdev_us(),
            },
            "overruns": w.overruns,
            "nominal_rate_hz": rate,
        });
        println!("{obj}");
    } else {
        println!(
            "stats: cycles={} failed={} windows={} window_us(min/mean/max/stdev)={}/{:.1}/{}/{:.1} overruns={} nominal_rate_hz={:.3}",
            summary.cycles,
            summary.failed_cycles,
            w.count,
            w.min_us,
            w.mean_us(),
            w.max_us,
            w.stdev_us(),
            w.overruns,
            rate
        );
    }
}

pub fn run_monitor(
    cfg: &knock_config::Config,
    opts: RunOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let lock = opts.rt_lock.unwrap_or(RtLock::os_default());
    setup_rt_once(opts.rt, opts.rt_prio, lock, opts.rt_cpu);

    let mut monitor = build_monitor(cfg)?;
    tracing::debug!(?monitor, "monitor assembled");
    let summary = knock_core::run(
        &mut monitor,
        RunParams {
            cycles: opts.cycles,
            shutdown: Some(shutdown),
        },
    )?;
    if opts.stats {
        print_stats(&summary, monitor.timing(), monitor.mode());
    }
    Ok(())
}

/// Program the SPU, run one cycle, and report what was seen.
pub fn self_check(cfg: &knock_config::Config) -> eyre::Result<()> {
    let mut monitor = build_monitor(cfg)?;
    let writes = monitor.start()?;
    let report = monitor.cycle();
    monitor.shutdown_outputs();
    let report = report?;
    let logging = monitor.logging_state().enabled;
    if json_mode() {
        let obj = serde_json::json!({
            "ok": true,
            "registers": writes.len(),
            "mode": format!("{:?}", monitor.mode()),
            "logging": logging,
            "output": report.output,
            "limit": report.limit,
        });
        println!("{obj}");
    } else {
        println!(
            "self-check ok: {} registers written, {:?} mode, logging {}, output {}",
            writes.len(),
            monitor.mode(),
            if logging { "on" } else { "off" },
            report.output
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("100,900", (100, 900))]
    #[case(" 7 , 8 ", (7, 8))]
    #[case("1023", (1023, 1023))]
    fn sim_levels_parse(#[case] input: &str, #[case] expected: (u16, u16)) {
        assert_eq!(parse_sim_levels(input).unwrap(), expected);
    }

    #[test]
    fn sim_levels_reject_garbage() {
        let err = parse_sim_levels("loud,quiet").unwrap_err();
        assert!(err.to_string().contains(SIM_RAW_ENV));
    }
}
