//! SPU command set.
//!
//! Every command is a single byte whose top bits select the register:
//!
//! | register        | prefix   | payload            |
//! |-----------------|----------|--------------------|
//! | band-pass       | `00`     | 6-bit index        |
//! | prescaler / SDO | `01`     | 5-bit code, SDO    |
//! | gain            | `10`     | 6-bit index        |
//! | integrator time | `110`    | 5-bit index        |
//! | channel select  | `111000` | channel bit        |

use crate::error::KnockError;

/// 6 MHz oscillator prescaler with SDO active.
pub const PRESCALER_6MHZ: u8 = 0b0100_0100;
/// Band-pass centred on 7.27 kHz.
pub const BANDPASS_7_27KHZ: u8 = 0b0010_1010;
/// Programmable gain 0.381.
pub const GAIN_0_381: u8 = 0b1010_0010;
/// Integrator time constant 100 us.
pub const INTEGRATOR_100US: u8 = 0b1100_1010;

const SELECT_PREFIX: u8 = 0b1110_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpuCommand {
    Prescaler { code: u8, sdo_active: bool },
    SelectChannel(u8),
    BandPass(u8),
    Gain(u8),
    IntegratorTime(u8),
}

impl SpuCommand {
    /// Encode to the wire byte. Payloads are masked to their field width.
    pub const fn to_byte(self) -> u8 {
        match self {
            SpuCommand::Prescaler { code, sdo_active } => {
                0b0100_0000 | ((code & 0x1F) << 1) | if sdo_active { 0 } else { 1 }
            }
            SpuCommand::SelectChannel(id) => SELECT_PREFIX | (id.saturating_sub(1) & 0x01),
            SpuCommand::BandPass(idx) => idx & 0x3F,
            SpuCommand::Gain(idx) => 0b1000_0000 | (idx & 0x3F),
            SpuCommand::IntegratorTime(idx) => 0b1100_0000 | (idx & 0x1F),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SpuCommand::Prescaler { .. } => "prescaler",
            SpuCommand::SelectChannel(_) => "channel select",
            SpuCommand::BandPass(_) => "band-pass frequency",
            SpuCommand::Gain(_) => "gain",
            SpuCommand::IntegratorTime(_) => "integrator time",
        }
    }
}

/// One knock sensor input of the SPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_id: u8,
    pub select_command: u8,
}

impl ChannelConfig {
    pub const fn command(&self) -> SpuCommand {
        SpuCommand::SelectChannel(self.channel_id)
    }
}

pub const CHANNEL_1: ChannelConfig = ChannelConfig {
    channel_id: 1,
    select_command: SpuCommand::SelectChannel(1).to_byte(),
};

pub const CHANNEL_2: ChannelConfig = ChannelConfig {
    channel_id: 2,
    select_command: SpuCommand::SelectChannel(2).to_byte(),
};

/// Start-up register table, written in `sequence()` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpuConfiguration {
    prescaler: SpuCommand,
    bandpass: SpuCommand,
    gain: SpuCommand,
    integrator: SpuCommand,
}

impl Default for SpuConfiguration {
    fn default() -> Self {
        Self {
            prescaler: SpuCommand::Prescaler {
                code: 2,
                sdo_active: true,
            },
            bandpass: SpuCommand::BandPass(42),
            gain: SpuCommand::Gain(34),
            integrator: SpuCommand::IntegratorTime(10),
        }
    }
}

impl SpuConfiguration {
    pub fn new(
        prescaler_code: u8,
        sdo_active: bool,
        bandpass_index: u8,
        gain_index: u8,
        integrator_index: u8,
    ) -> Result<Self, KnockError> {
        if prescaler_code > 31 {
            return Err(KnockError::Config(format!(
                "prescaler code {prescaler_code} exceeds 31"
            )));
        }
        if bandpass_index > 63 {
            return Err(KnockError::Config(format!(
                "band-pass index {bandpass_index} exceeds 63"
            )));
        }
        if gain_index > 63 {
            return Err(KnockError::Config(format!(
                "gain index {gain_index} exceeds 63"
            )));
        }
        if integrator_index > 31 {
            return Err(KnockError::Config(format!(
                "integrator index {integrator_index} exceeds 31"
            )));
        }
        Ok(Self {
            prescaler: SpuCommand::Prescaler {
                code: prescaler_code,
                sdo_active,
            },
            bandpass: SpuCommand::BandPass(bandpass_index),
            gain: SpuCommand::Gain(gain_index),
            integrator: SpuCommand::IntegratorTime(integrator_index),
        })
    }

    /// Prescaler, band-pass, gain, integrator time. The SPU ignores
    /// measurements until all four have been written in this order.
    pub fn sequence(&self) -> [SpuCommand; 4] {
        [self.prescaler, self.bandpass, self.gain, self.integrator]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_shield_bytes() {
        let bytes: Vec<u8> = SpuConfiguration::default()
            .sequence()
            .iter()
            .map(|c| c.to_byte())
            .collect();
        assert_eq!(
            bytes,
            vec![PRESCALER_6MHZ, BANDPASS_7_27KHZ, GAIN_0_381, INTEGRATOR_100US]
        );
    }

    #[test]
    fn channel_select_bytes() {
        assert_eq!(CHANNEL_1.select_command, 0b1110_0000);
        assert_eq!(CHANNEL_2.select_command, 0b1110_0001);
        assert_eq!(CHANNEL_2.command().to_byte(), CHANNEL_2.select_command);
    }

    #[test]
    fn sdo_disabled_sets_low_bit() {
        let c = SpuCommand::Prescaler {
            code: 2,
            sdo_active: false,
        };
        assert_eq!(c.to_byte(), 0b0100_0101);
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert!(SpuConfiguration::new(32, true, 42, 34, 10).is_err());
        assert!(SpuConfiguration::new(2, true, 64, 34, 10).is_err());
        assert!(SpuConfiguration::new(2, true, 42, 64, 10).is_err());
        assert!(SpuConfiguration::new(2, true, 42, 34, 32).is_err());
        assert_eq!(
            SpuConfiguration::new(2, true, 42, 34, 10).unwrap(),
            SpuConfiguration::default()
        );
    }
}
