use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum KnockError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("spu not configured; call start() before measuring")]
    NotConfigured,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing spu spi bus")]
    MissingBus,
    #[error("missing spu chip select line")]
    MissingSelect,
    #[error("missing hold line")]
    MissingHold,
    #[error("missing adc")]
    MissingAdc,
    #[error("missing status led")]
    MissingStatusLed,
    #[error("missing limit led")]
    MissingLimitLed,
    #[error("missing analog output")]
    MissingAnalogOutput,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
