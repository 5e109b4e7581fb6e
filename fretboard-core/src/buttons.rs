//! Board buttons: debounced inputs and press/release reporting

use embedded_hal::digital::InputPin;

use crate::hal::HalError;

/// The seven board buttons, in state-mask bit order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    Left,
    Right,
    Up,
    Down,
    Fire,
    User,
    Mode,
}

const MESSAGES: [[&[u8]; 2]; ButtonId::COUNT] = [
    [b"LEFT PRESSED\n", b"LEFT RELEASED\n"],
    [b"RIGHT PRESSED\n", b"RIGHT RELEASED\n"],
    [b"UP PRESSED\n", b"UP RELEASED\n"],
    [b"DOWN PRESSED\n", b"DOWN RELEASED\n"],
    [b"FIRE PRESSED\n", b"FIRE RELEASED\n"],
    [b"USER PRESSED\n", b"USER RELEASED\n"],
    [b"MODE PRESSED\n", b"MODE RELEASED\n"],
];

impl ButtonId {
    pub const COUNT: usize = 7;

    pub const ALL: [ButtonId; Self::COUNT] = [
        ButtonId::Left,
        ButtonId::Right,
        ButtonId::Up,
        ButtonId::Down,
        ButtonId::Fire,
        ButtonId::User,
        ButtonId::Mode,
    ];

    /// Bit of this button in a state mask.
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Mode reads high when pressed; the joystick and user buttons pull low.
    pub const fn is_active_high(self) -> bool {
        matches!(self, ButtonId::Mode)
    }

    /// Line reported over serial for a press or release.
    pub fn message(self, pressed: bool) -> &'static [u8] {
        MESSAGES[self as usize][usize::from(!pressed)]
    }
}

const _: () = assert!(ButtonId::COUNT <= u8::BITS as usize);

/// One button changing state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonEvent {
    pub button: ButtonId,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn message(&self) -> &'static [u8] {
        self.button.message(self.pressed)
    }
}

/// Turns successive button state masks into press/release events.
#[derive(Copy, Clone, Debug, Default)]
pub struct ButtonTracker {
    last: u8,
}

impl ButtonTracker {
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    pub fn state(&self) -> u8 {
        self.last
    }

    /// Record `state` and yield one event per button that changed, in
    /// button order.
    pub fn update(&mut self, state: u8) -> impl Iterator<Item = ButtonEvent> {
        let changed = state ^ self.last;
        self.last = state;
        ButtonId::ALL
            .into_iter()
            .filter(move |button| changed & button.bit() != 0)
            .map(move |button| ButtonEvent {
                button,
                pressed: state & button.bit() != 0,
            })
    }
}

/// Debounced push button on an embedded-hal input pin.
///
/// A new level is accepted after `threshold` consecutive samples agree on it.
pub struct DebouncedButton<P> {
    pin: P,
    active_high: bool,
    threshold: u8,
    streak: u8,
    pressed: bool,
}

impl<P> DebouncedButton<P>
where
    P: InputPin,
{
    pub fn new(pin: P, active_high: bool, threshold: u8) -> Result<Self, HalError> {
        if threshold == 0 {
            return Err(HalError::InvalidConfig);
        }
        Ok(Self {
            pin,
            active_high,
            threshold,
            streak: 0,
            pressed: false,
        })
    }

    /// Wire up one of the board buttons with its polarity.
    pub fn for_button(pin: P, button: ButtonId, threshold: u8) -> Result<Self, HalError> {
        Self::new(pin, button.is_active_high(), threshold)
    }

    /// Raw, undebounced level.
    pub fn is_active_raw(&mut self) -> Result<bool, HalError> {
        let high = self.pin.is_high().map_err(|_| HalError::GpioError)?;
        Ok(high == self.active_high)
    }

    /// Take one sample. Returns the new state when it just changed.
    pub fn sample(&mut self) -> Result<Option<bool>, HalError> {
        let raw = self.is_active_raw()?;
        if raw == self.pressed {
            self.streak = 0;
            return Ok(None);
        }
        self.streak += 1;
        if self.streak < self.threshold {
            return Ok(None);
        }
        self.streak = 0;
        self.pressed = raw;
        Ok(Some(raw))
    }

    /// Debounced state.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn release(self) -> P {
        self.pin
    }
}
