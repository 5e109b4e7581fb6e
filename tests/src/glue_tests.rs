//! Buttons, LEDs and the LCD on embedded-hal pins

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};
use fretboard_core::buttons::{ButtonEvent, ButtonId, ButtonTracker, DebouncedButton};
use fretboard_core::hal::HalError;
use fretboard_core::lcd::{LcdPins, St7735};
use fretboard_core::leds::{Led, LedBank, LedColor, LedCommandParser};

fn reads(levels: &[PinState]) -> Vec<PinTransaction> {
    levels.iter().map(|level| PinTransaction::get(*level)).collect()
}

#[test]
fn button_needs_agreeing_samples() {
    use PinState::{High, Low};
    let expectations = reads(&[Low, Low, High, Low, Low, Low, High, High, High]);
    let mut pin = PinMock::new(&expectations);
    // active low, three samples to change
    let mut button = DebouncedButton::new(pin.clone(), false, 3).unwrap();

    let results: Vec<Option<bool>> = (0..expectations.len())
        .map(|_| button.sample().unwrap())
        .collect();
    assert_eq!(
        results,
        [None, None, None, None, None, Some(true), None, None, Some(false)]
    );
    assert!(!button.is_pressed());
    pin.done();
}

#[test]
fn zero_threshold_is_rejected() {
    let mut pin = PinMock::new(&[]);
    assert!(matches!(
        DebouncedButton::new(pin.clone(), true, 0),
        Err(HalError::InvalidConfig)
    ));
    pin.done();
}

#[test]
fn mode_button_is_active_high() {
    let mut pin = PinMock::new(&reads(&[PinState::High]));
    let mut button = DebouncedButton::for_button(pin.clone(), ButtonId::Mode, 1).unwrap();
    assert_eq!(button.sample().unwrap(), Some(true));
    pin.done();
}

#[test]
fn tracker_reports_each_edge_once() {
    let mut tracker = ButtonTracker::new();
    let fire = ButtonId::Fire.bit();
    let left = ButtonId::Left.bit();

    let pressed: Vec<ButtonEvent> = tracker.update(fire | left).collect();
    assert_eq!(pressed.len(), 2);
    assert!(pressed.iter().all(|event| event.pressed));
    assert_eq!(tracker.update(fire | left).count(), 0);

    let released: Vec<ButtonEvent> = tracker.update(left).collect();
    assert_eq!(
        released,
        [ButtonEvent { button: ButtonId::Fire, pressed: false }]
    );
}

/// Output pin that only remembers its level.
#[derive(Clone, Default)]
struct LevelPin(Rc<RefCell<bool>>);

impl LevelPin {
    fn is_high(&self) -> bool {
        *self.0.borrow()
    }
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl OutputPin for LevelPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        *self.0.borrow_mut() = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        *self.0.borrow_mut() = true;
        Ok(())
    }
}

impl StatefulOutputPin for LevelPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(*self.0.borrow())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!*self.0.borrow())
    }
}

#[test]
fn serial_commands_drive_the_led_bank() {
    let pins: [LevelPin; 4] = Default::default();
    let polarity = [true, true, true, false];
    let leds = [0, 1, 2, 3].map(|i| Led::new(pins[i].clone(), polarity[i]).unwrap());
    let mut bank = LedBank::new(leds);

    // off means high for the active-low LEDs
    assert_eq!(pins.each_ref().map(LevelPin::is_high), [true, true, true, false]);

    let mut parser = LedCommandParser::new();
    for byte in b"LR1 LgT LB1 LBT" {
        if let Some(command) = parser.push(*byte) {
            bank.apply(command).unwrap();
        }
    }
    assert!(bank.led(LedColor::Red).is_on().unwrap());
    assert!(bank.led(LedColor::Green2).is_on().unwrap());
    assert!(!bank.led(LedColor::Blue).is_on().unwrap());
    assert!(!bank.led(LedColor::Green).is_on().unwrap());
    assert_eq!(pins.each_ref().map(LevelPin::is_high), [false, true, true, true]);

    bank.all_off().unwrap();
    assert_eq!(pins.each_ref().map(LevelPin::is_high), [true, true, true, false]);
}

#[test]
fn lcd_parks_the_bus_and_skips_offscreen_fills() {
    let mut cs = PinMock::new(&[PinTransaction::set(PinState::High)]);
    let mut a0 = PinMock::new(&[PinTransaction::set(PinState::High)]);
    let mut sda = PinMock::new(&[PinTransaction::set(PinState::Low)]);
    let mut sck = PinMock::new(&[PinTransaction::set(PinState::Low)]);
    let pins = LcdPins {
        cs: cs.clone(),
        a0: a0.clone(),
        sda: sda.clone(),
        sck: sck.clone(),
    };
    let mut lcd = St7735::new(pins, NoopDelay).unwrap();
    assert_eq!(lcd.size(), Size::new(128, 160));

    let offscreen = Rectangle::new(Point::new(200, 300), Size::new(8, 8));
    lcd.fill_solid(&offscreen, Rgb565::RED).unwrap();

    cs.done();
    a0.done();
    sda.done();
    sck.done();
}
