//! Human-readable error descriptions and structured JSON error formatting.

use knock_core::error::{BuildError, KnockError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            missing => format!(
                "What happened: The monitor could not be assembled ({missing}).\nLikely causes: A peripheral failed to open or was not wired into the builder.\nHow to fix: Check the [pins], [spi], [adc] and [pwm] sections and rerun with --log-level=debug."
            ),
        };
    }

    if let Some(ke) = err.downcast_ref::<KnockError>() {
        return match ke {
            KnockError::NotConfigured => "What happened: A measurement was attempted before the SPU was programmed.\nLikely causes: start() failed or was skipped.\nHow to fix: Check the earlier register write errors.".to_string(),
            KnockError::HardwareFault(msg) | KnockError::Hardware(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: SPI/GPIO/PWM not enabled, wrong bus or pin numbers, or insufficient permissions.\nHow to fix: Enable the interfaces (raspi-config), check the config, and make sure the user can access /dev/spidev* and /dev/gpiomem."
            ),
            KnockError::Config(msg) => format!(
                "What happened: Invalid SPU configuration ({msg}).\nLikely causes: A register index outside its field width.\nHow to fix: Edit the [spu] section and rerun."
            ),
            KnockError::Io(msg) => format!(
                "What happened: I/O error ({msg}).\nLikely causes: Storage or device node unavailable.\nHow to fix: Check paths and permissions."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nHow to fix: Pass --config FILE or create etc/knock_config.toml. Original: {msg}"
        );
    }
    if lower.starts_with("parse config") || lower.contains("missing field") {
        return format!(
            "What happened: The config file is not valid TOML for this tool.\nLikely causes: Missing [pins] section or a misspelled key.\nHow to fix: Compare with etc/knock_config.toml. Original: {msg}"
        );
    }
    if is_config_message(&lower) {
        return format!(
            "What happened: Configuration is invalid.\nHow to fix: Edit the TOML config and try again. Original: {msg}"
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

// validate() messages name the offending `section.key`
fn is_config_message(lower: &str) -> bool {
    const SECTIONS: [&str; 8] = [
        "pins.", "spi.", "adc.", "pwm.", "spu.", "timing.", "storage.", "logging.",
    ];
    lower.starts_with("read config")
        || lower.starts_with("parse config")
        || lower.contains("invalid config")
        || SECTIONS.iter().any(|s| lower.starts_with(s))
}

/// 0 ok, 1 runtime failure, 2 configuration or build error.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if matches!(err.downcast_ref::<KnockError>(), Some(KnockError::Config(_))) {
        return 2;
    }
    if is_config_message(&err.to_string().to_ascii_lowercase()) {
        return 2;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<KnockError>() {
        Some(KnockError::Hardware(_) | KnockError::HardwareFault(_)) => "Hardware",
        Some(KnockError::NotConfigured) => "NotConfigured",
        Some(KnockError::Config(_)) => "Config",
        Some(KnockError::Io(_)) => "Io",
        None if exit_code_for_error(err) == 2 => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_exit_with_config_code() {
        let err = eyre::Report::new(BuildError::MissingAdc);
        assert_eq!(exit_code_for_error(&err), 2);
        assert!(humanize(&err).contains("missing adc"));
    }

    #[test]
    fn validation_messages_exit_with_config_code() {
        let err = eyre::eyre!("spu.channels must be 1 or 2");
        assert_eq!(exit_code_for_error(&err), 2);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Config");
        assert_eq!(v["exit_code"], 2);
    }

    #[test]
    fn hardware_errors_are_runtime_failures() {
        let err = eyre::Report::new(KnockError::HardwareFault("spi error: transfer".into()));
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).contains("Hardware error"));
    }
}
