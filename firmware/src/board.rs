//! Board wiring: LCD, LEDs and buttons on their pins

use embedded_graphics::pixelcolor::Rgb565;
use embedded_hal::delay::DelayNs;
use fretboard_core::buttons::{ButtonId, DebouncedButton};
use fretboard_core::hal::HalError;
use fretboard_core::lcd::{LcdPins, St7735};
use fretboard_core::leds::{Led, LedBank};

use crate::gpio::{GpioPin, Port, Pull};

/// Core and bus clock: the 16 MHz HSI with reset-value prescalers.
pub const HSI_HZ: u32 = 16_000_000;

/// Busy-wait delay counted in core cycles.
#[derive(Copy, Clone, Debug)]
pub struct CycleDelay {
    cycles_per_us: u32,
}

impl CycleDelay {
    pub const fn new(core_hz: u32) -> Self {
        Self {
            cycles_per_us: core_hz / 1_000_000,
        }
    }
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (u64::from(ns) * u64::from(self.cycles_per_us)).div_ceil(1000);
        cortex_m::asm::delay(cycles.min(u64::from(u32::MAX)) as u32);
    }
}

pub type Lcd = St7735<GpioPin, CycleDelay>;

/// Bring up the ST7735 on CS PC11, A0 PC12, SDA PB15, SCK PB13 and clear it.
pub fn init_lcd(background: Rgb565) -> Result<Lcd, HalError> {
    Port::B.enable_clock();
    Port::C.enable_clock();
    let pins = LcdPins {
        cs: GpioPin::new(Port::C, 11).into_output(true),
        a0: GpioPin::new(Port::C, 12).into_output(true),
        sda: GpioPin::new(Port::B, 15).into_output(false),
        sck: GpioPin::new(Port::B, 13).into_output(false),
    };
    let mut lcd = St7735::new(pins, CycleDelay::new(HSI_HZ))?;
    lcd.init(background)?;
    Ok(lcd)
}

/// Red PA6, green PA7, blue PB0 (all active low) and second green PA5.
pub fn init_leds() -> Result<LedBank<GpioPin>, HalError> {
    Port::A.enable_clock();
    Port::B.enable_clock();
    let led = |port, pin, active_low: bool| {
        Led::new(GpioPin::new(port, pin).into_output(active_low), active_low)
    };
    Ok(LedBank::new([
        led(Port::A, 6, true)?,
        led(Port::A, 7, true)?,
        led(Port::B, 0, true)?,
        led(Port::A, 5, false)?,
    ]))
}

/// Consecutive agreeing samples before a button changes state.
pub const BUTTON_DEBOUNCE_SAMPLES: u8 = 5;

const fn button_pin(button: ButtonId) -> GpioPin {
    match button {
        ButtonId::Left => GpioPin::new(Port::B, 3),
        ButtonId::Right => GpioPin::new(Port::B, 4),
        ButtonId::Up => GpioPin::new(Port::B, 5),
        ButtonId::Down => GpioPin::new(Port::B, 6),
        ButtonId::Fire => GpioPin::new(Port::B, 10),
        ButtonId::User => GpioPin::new(Port::C, 13),
        ButtonId::Mode => GpioPin::new(Port::A, 0),
    }
}

pub type Buttons = [DebouncedButton<GpioPin>; ButtonId::COUNT];

/// Joystick on PB3-PB6 and PB10, user on PC13, mode on PA0. The board
/// supplies the pull resistors.
pub fn init_buttons() -> Result<Buttons, HalError> {
    for port in [Port::A, Port::B, Port::C] {
        port.enable_clock();
    }
    let button = |id: ButtonId| {
        let pin = button_pin(id).into_input(Pull::None);
        DebouncedButton::for_button(pin, id, BUTTON_DEBOUNCE_SAMPLES)
    };
    Ok([
        button(ButtonId::Left)?,
        button(ButtonId::Right)?,
        button(ButtonId::Up)?,
        button(ButtonId::Down)?,
        button(ButtonId::Fire)?,
        button(ButtonId::User)?,
        button(ButtonId::Mode)?,
    ])
}
