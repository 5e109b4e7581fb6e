//! GPIO pins as embedded-hal 1.0 digital pins

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use stm32f4::stm32f411::{gpioa, GPIOA, GPIOB, GPIOC, RCC};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pull {
    None = 0b00,
    Up = 0b01,
    Down = 0b10,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Port {
    A,
    B,
    C,
}

impl Port {
    /// Every port shares GPIOA's register layout.
    fn block(self) -> &'static gpioa::RegisterBlock {
        let ptr = match self {
            Port::A => GPIOA::ptr(),
            Port::B => GPIOB::ptr() as *const gpioa::RegisterBlock,
            Port::C => GPIOC::ptr() as *const gpioa::RegisterBlock,
        };
        // SAFETY: fixed MMIO block; pins of one port only touch their own
        // fields, through read-modify-write or the atomic BSRR.
        unsafe { &*ptr }
    }

    pub fn enable_clock(self) {
        // SAFETY: RCC enable bits are only ever set, never cleared.
        let rcc = unsafe { &*RCC::ptr() };
        rcc.ahb1enr.modify(|_, w| match self {
            Port::A => w.gpioaen().set_bit(),
            Port::B => w.gpioben().set_bit(),
            Port::C => w.gpiocen().set_bit(),
        });
    }
}

/// One pin of a GPIO port.
///
/// The port clock must already be enabled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GpioPin {
    port: Port,
    pin: u8,
}

const fn replace_field(bits: u32, pin: u8, width: u32, value: u32) -> u32 {
    let shift = pin as u32 * width;
    let mask = ((1 << width) - 1) << shift;
    (bits & !mask) | ((value << shift) & mask)
}

impl GpioPin {
    pub const fn new(port: Port, pin: u8) -> Self {
        Self { port, pin }
    }

    pub const fn pin(&self) -> u8 {
        self.pin
    }

    fn configure(&self, mode: u32, pull: Pull) {
        let gpio = self.port.block();
        let pin = self.pin;
        // SAFETY: every value written is a valid encoding for its field.
        gpio.otyper.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 1, 0)) });
        gpio.ospeedr.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 2, 0b10)) });
        gpio.pupdr.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 2, pull as u32)) });
        gpio.moder.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 2, mode)) });
    }

    /// Push-pull output, high speed, starting at `high`.
    pub fn into_output(self, high: bool) -> Self {
        self.write(high);
        self.configure(0b01, Pull::None);
        self
    }

    pub fn into_input(self, pull: Pull) -> Self {
        let gpio = self.port.block();
        let pin = self.pin;
        // SAFETY: as in `configure`
        gpio.pupdr.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 2, pull as u32)) });
        gpio.moder.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 2, 0b00)) });
        self
    }

    /// Alternate function `af`, push-pull.
    pub fn into_alternate(self, af: u8, pull: Pull) -> Self {
        let gpio = self.port.block();
        let af = u32::from(af & 0xF);
        // SAFETY: AF numbers are four-bit fields
        if self.pin < 8 {
            let pin = self.pin;
            gpio.afrl.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 4, af)) });
        } else {
            let pin = self.pin - 8;
            gpio.afrh.modify(|r, w| unsafe { w.bits(replace_field(r.bits(), pin, 4, af)) });
        }
        self.configure(0b10, pull);
        self
    }

    pub fn write(&self, high: bool) {
        let bit = 1u32 << self.pin;
        // SAFETY: BSRR is write-only set/reset, other pins are untouched
        self.port
            .block()
            .bsrr
            .write(|w| unsafe { w.bits(if high { bit } else { bit << 16 }) });
    }

    pub fn read_input(&self) -> bool {
        self.port.block().idr.read().bits() & (1 << self.pin) != 0
    }

    pub fn read_output(&self) -> bool {
        self.port.block().odr.read().bits() & (1 << self.pin) != 0
    }
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl InputPin for GpioPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_input())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read_input())
    }
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl StatefulOutputPin for GpioPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_output())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read_output())
    }
}

const _: () = {
    // PC13 pull-up in PUPDR bits 27:26, neighbours kept
    assert!(replace_field(u32::MAX, 13, 2, Pull::Up as u32) == !(0b10 << 26));
    // AF7 on PA3 in AFRL bits 15:12
    assert!(replace_field(0, 3, 4, 7) == 0x7000);
};
