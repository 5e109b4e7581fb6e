//! Board LEDs and the `L<color><op>` serial command protocol

use embedded_hal::digital::StatefulOutputPin;

use crate::hal::HalError;

/// Command length: `L`, color, operation.
pub const LED_COMMAND_LEN: usize = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedColor {
    Red,
    Green,
    Blue,
    /// Second green LED
    Green2,
}

impl LedColor {
    pub const ALL: [LedColor; 4] = [LedColor::Red, LedColor::Green, LedColor::Blue, LedColor::Green2];

    pub const fn from_byte(byte: u8) -> Option<LedColor> {
        match byte {
            b'R' => Some(LedColor::Red),
            b'G' => Some(LedColor::Green),
            b'B' => Some(LedColor::Blue),
            b'g' => Some(LedColor::Green2),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedOp {
    Off,
    On,
    Toggle,
}

impl LedOp {
    pub const fn from_byte(byte: u8) -> Option<LedOp> {
        match byte {
            b'0' => Some(LedOp::Off),
            b'1' => Some(LedOp::On),
            b'T' => Some(LedOp::Toggle),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedCommand {
    pub color: LedColor,
    pub op: LedOp,
}

impl LedCommand {
    pub fn parse(bytes: [u8; LED_COMMAND_LEN]) -> Option<LedCommand> {
        if bytes[0] != b'L' {
            return None;
        }
        Some(LedCommand {
            color: LedColor::from_byte(bytes[1])?,
            op: LedOp::from_byte(bytes[2])?,
        })
    }
}

/// Rolling parser fed one received byte at a time.
///
/// Once three bytes are buffered they either form a command (and the buffer
/// empties) or the oldest byte is discarded, so the parser resynchronizes on
/// the next `L`.
#[derive(Clone, Debug, Default)]
pub struct LedCommandParser {
    buf: [u8; LED_COMMAND_LEN],
    start: usize,
    size: usize,
}

impl LedCommandParser {
    pub const fn new() -> Self {
        Self {
            buf: [0; LED_COMMAND_LEN],
            start: 0,
            size: 0,
        }
    }

    fn nth(&self, n: usize) -> u8 {
        self.buf[(self.start + n) % LED_COMMAND_LEN]
    }

    pub fn push(&mut self, byte: u8) -> Option<LedCommand> {
        self.buf[(self.start + self.size) % LED_COMMAND_LEN] = byte;
        self.size += 1;
        if self.size < LED_COMMAND_LEN {
            return None;
        }

        match LedCommand::parse([self.nth(0), self.nth(1), self.nth(2)]) {
            Some(command) => {
                self.start = 0;
                self.size = 0;
                Some(command)
            }
            None => {
                self.start = (self.start + 1) % LED_COMMAND_LEN;
                self.size -= 1;
                None
            }
        }
    }
}

/// An LED on a stateful output pin.
pub struct Led<P> {
    pin: P,
    active_low: bool,
}

impl<P> Led<P>
where
    P: StatefulOutputPin,
{
    /// Wrap `pin` and switch the LED off.
    pub fn new(pin: P, active_low: bool) -> Result<Self, HalError> {
        let mut led = Self { pin, active_low };
        led.off()?;
        Ok(led)
    }

    pub fn set(&mut self, on: bool) -> Result<(), HalError> {
        let high = on != self.active_low;
        let result = if high { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|_| HalError::GpioError)
    }

    pub fn on(&mut self) -> Result<(), HalError> {
        self.set(true)
    }

    pub fn off(&mut self) -> Result<(), HalError> {
        self.set(false)
    }

    pub fn is_on(&mut self) -> Result<bool, HalError> {
        let high = self.pin.is_set_high().map_err(|_| HalError::GpioError)?;
        Ok(high != self.active_low)
    }

    pub fn toggle(&mut self) -> Result<(), HalError> {
        self.pin.toggle().map_err(|_| HalError::GpioError)
    }

    pub fn apply(&mut self, op: LedOp) -> Result<(), HalError> {
        match op {
            LedOp::Off => self.off(),
            LedOp::On => self.on(),
            LedOp::Toggle => self.toggle(),
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

/// The four board LEDs, indexed by [`LedColor`].
pub struct LedBank<P> {
    leds: [Led<P>; 4],
}

impl<P> LedBank<P>
where
    P: StatefulOutputPin,
{
    /// LEDs in [`LedColor::ALL`] order.
    pub fn new(leds: [Led<P>; 4]) -> Self {
        Self { leds }
    }

    pub fn led(&mut self, color: LedColor) -> &mut Led<P> {
        &mut self.leds[color.index()]
    }

    pub fn apply(&mut self, command: LedCommand) -> Result<(), HalError> {
        debug!("led {} {}", command.color, command.op);
        self.led(command.color).apply(command.op)
    }

    pub fn all_off(&mut self) -> Result<(), HalError> {
        self.leds.iter_mut().try_for_each(|led| led.off())
    }

    pub fn release(self) -> [Led<P>; 4] {
        self.leds
    }
}
