#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Knock monitor logic (hardware-agnostic).
//!
//! Drives a TPIC8101-style knock signal processing unit (SPU) through the
//! `knock_traits` seams: an SPI bus plus chip select for register writes, a
//! hold line gating the integrator, an ADC sampling the integrator output,
//! two indicator LEDs and a PWM analog output.
//!
//! ## Architecture
//!
//! - **Registers**: SPU command bytes and the power-on sequence (`registers`)
//! - **Transport**: chip-select framed single-byte SPI exchange (`transport`)
//! - **SPU driver**: configuration, channel select, hold windows (`spu`)
//! - **Conditioning**: raw ADC to percent, duty and limit flag (`conditioner`)
//! - **Control loop**: `KnockMonitor::start` / `KnockMonitor::cycle`, driven
//!   by `runner::run`
//!
//! The ADC range is 0..=1023; the analog output is 8-bit and the limit LED
//! lights at a duty of 204 (80%) or more.

pub mod builder;
pub mod conditioner;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod indicator;
pub mod logger;
pub mod mocks;
pub mod monitor;
pub mod registers;
pub mod report;
pub mod runner;
pub mod spu;
pub mod transport;
pub mod util;

pub use builder::MonitorBuilder;
pub use conditioner::{ADC_MAX, LIMIT_THRESHOLD, Measurement};
pub use config::{ChannelMode, TimingCfg};
pub use error::{BuildError, KnockError, Report, Result};
pub use logger::{FileLogger, KnockLog, LoggingState, StdoutSink};
pub use monitor::KnockMonitor;
pub use registers::{CHANNEL_1, CHANNEL_2, ChannelConfig, SpuCommand, SpuConfiguration};
pub use report::CycleReport;
pub use runner::{RunParams, RunSummary, WindowStats, run};
pub use spu::{RegisterWrite, WindowSample};
