//! Simulated knock shield.
//!
//! All handles share one `SimShield` state: the bus decodes channel-select
//! commands, the ADC returns the level of whichever channel is selected, and
//! lines/PWM remember what was last written so tests and `self-check` can
//! inspect them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use knock_traits::{AnalogInput, AnalogOutput, HwError, OutputLine, SpiBus};
use tracing::trace;

use crate::mcp3008::MAX_CODE;

const SELECT_MASK: u8 = 0b1111_1110;
const SELECT_PREFIX: u8 = 0b1110_0000;

#[derive(Debug, Default)]
struct SimState {
    levels: [u16; 2],
    sweep_step: u16,
    selected: usize,
    last_byte: u8,
    written: Vec<u8>,
    lines: HashMap<&'static str, bool>,
    duty: Option<u8>,
    samples: u64,
}

/// Shared simulated front-end. Clone to hand out more handles.
#[derive(Debug, Clone, Default)]
pub struct SimShield {
    state: Rc<RefCell<SimState>>,
}

impl SimShield {
    /// Simulated shield with fixed per-channel ADC codes (clamped to 10 bits).
    pub fn new(level_ch1: u16, level_ch2: u16) -> Self {
        let state = SimState {
            levels: [level_ch1.min(MAX_CODE), level_ch2.min(MAX_CODE)],
            ..SimState::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Advance each channel's level by `step` codes after every sample,
    /// wrapping at 1024, so a running simulation shows movement.
    pub fn with_sweep(self, step: u16) -> Self {
        self.state.borrow_mut().sweep_step = step;
        self
    }

    pub fn set_level(&self, channel_id: u8, level: u16) {
        let mut st = self.state.borrow_mut();
        let idx = usize::from(channel_id.saturating_sub(1)).min(1);
        st.levels[idx] = level.min(MAX_CODE);
    }

    pub fn bus(&self) -> SimSpuBus {
        SimSpuBus {
            shield: self.clone(),
        }
    }

    pub fn adc(&self) -> SimAdc {
        SimAdc {
            shield: self.clone(),
        }
    }

    pub fn pwm(&self) -> SimPwm {
        SimPwm {
            shield: self.clone(),
        }
    }

    pub fn line(&self, name: &'static str) -> SimLine {
        SimLine {
            shield: self.clone(),
            name,
        }
    }

    /// Channel currently selected on the SPU (1 or 2).
    pub fn selected_channel(&self) -> u8 {
        self.state.borrow().selected as u8 + 1
    }

    /// Every byte written to the SPU bus, in order.
    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    /// Last level driven on a named line, if it was ever driven.
    pub fn line_level(&self, name: &str) -> Option<bool> {
        self.state.borrow().lines.get(name).copied()
    }

    pub fn last_duty(&self) -> Option<u8> {
        self.state.borrow().duty
    }

    pub fn samples(&self) -> u64 {
        self.state.borrow().samples
    }
}

pub struct SimSpuBus {
    shield: SimShield,
}

impl SpiBus for SimSpuBus {
    fn exchange(&mut self, byte: u8) -> Result<u8, HwError> {
        let mut st = self.shield.state.borrow_mut();
        if byte & SELECT_MASK == SELECT_PREFIX {
            st.selected = usize::from(byte & 1);
        }
        st.written.push(byte);
        // the SPU shifts out the previous command while clocking in the next
        let echo = std::mem::replace(&mut st.last_byte, byte);
        trace!(tx = byte, rx = echo, "sim spu exchange");
        Ok(echo)
    }
}

pub struct SimAdc {
    shield: SimShield,
}

impl AnalogInput for SimAdc {
    fn sample(&mut self) -> Result<u16, HwError> {
        let mut st = self.shield.state.borrow_mut();
        let idx = st.selected;
        let code = st.levels[idx];
        let step = st.sweep_step;
        if step > 0 {
            st.levels[idx] = (code + step) % (MAX_CODE + 1);
        }
        st.samples += 1;
        Ok(code)
    }
}

pub struct SimPwm {
    shield: SimShield,
}

impl AnalogOutput for SimPwm {
    fn write_duty(&mut self, duty: u8) -> Result<(), HwError> {
        self.shield.state.borrow_mut().duty = Some(duty);
        Ok(())
    }
}

pub struct SimLine {
    shield: SimShield,
    name: &'static str,
}

impl SimLine {
    fn drive(&mut self, high: bool) {
        self.shield.state.borrow_mut().lines.insert(self.name, high);
        trace!(line = self.name, high, "sim line");
    }
}

impl OutputLine for SimLine {
    fn set_high(&mut self) -> Result<(), HwError> {
        self.drive(true);
        Ok(())
    }
    fn set_low(&mut self) -> Result<(), HwError> {
        self.drive(false);
        Ok(())
    }
}
