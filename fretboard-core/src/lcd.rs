//! ST7735S panel driven over a bit-banged 3-wire serial link
//!
//! Pixels are 16-bit RGB565 words. Filled rectangles stream straight into a
//! controller window, which is what makes note scrolling affordable on a
//! software serial bus.

use embedded_graphics::pixelcolor::raw::{RawData, RawU16};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{ContainsPoint, Rectangle};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::hal::HalError;

pub const LCD_WIDTH: u32 = 128;
pub const LCD_HEIGHT: u32 = 160;

mod cmd {
    pub const SLEEP_OUT: u8 = 0x11;
    pub const DISPLAY_ON: u8 = 0x29;
    pub const COLUMN_ADDRESS: u8 = 0x2A;
    pub const ROW_ADDRESS: u8 = 0x2B;
    pub const MEMORY_WRITE: u8 = 0x2C;
    pub const MEMORY_ACCESS: u8 = 0x36;
    pub const PIXEL_FORMAT: u8 = 0x3A;
}

/// Controller setup after sleep-out: command, then its data words as
/// (value, bit width).
const INIT_SEQUENCE: &[(u8, &[(u32, u8)])] = &[
    // frame rate, normal / idle / partial
    (0xB1, &[(0x05_3C3C, 24)]),
    (0xB2, &[(0x05_3C3C, 24)]),
    (0xB3, &[(0x05_3C3C, 24), (0x05_3C3C, 24)]),
    // column inversion
    (0xB4, &[(0x03, 8)]),
    // power control
    (0xC0, &[(0x28_0804, 24)]),
    (0xC1, &[(0xC0, 8)]),
    (0xC2, &[(0x0D00, 16)]),
    (0xC3, &[(0x8D2A, 16)]),
    (0xC4, &[(0x8DEE, 16)]),
    // VCOM
    (0xC5, &[(0x1A, 8)]),
    (cmd::MEMORY_ACCESS, &[(0xC0, 8)]),
    // 16 bits per pixel
    (cmd::PIXEL_FORMAT, &[(0x05, 8)]),
    // gamma
    (
        0xE0,
        &[(0x0422_070A, 32), (0x2E30_252A, 32), (0x2826_2E3A, 32), (0x0001_0313, 32)],
    ),
    (
        0xE1,
        &[(0x0416_060D, 32), (0x2D26_2327, 32), (0x2725_2D3B, 32), (0x0001_0413, 32)],
    ),
];

/// The four lines of the panel's serial interface.
pub struct LcdPins<P> {
    /// Chip select, active low
    pub cs: P,
    /// Data (high) / command (low)
    pub a0: P,
    pub sda: P,
    pub sck: P,
}

pub struct St7735<P, D> {
    pins: LcdPins<P>,
    delay: D,
}

impl<P, D> St7735<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Take the pins and park the bus idle: deselected, data mode, clock low.
    pub fn new(mut pins: LcdPins<P>, delay: D) -> Result<Self, HalError> {
        pins.cs.set_high().map_err(|_| HalError::GpioError)?;
        pins.a0.set_high().map_err(|_| HalError::GpioError)?;
        pins.sda.set_low().map_err(|_| HalError::GpioError)?;
        pins.sck.set_low().map_err(|_| HalError::GpioError)?;
        Ok(Self { pins, delay })
    }

    /// Wake the controller, program it and blank the screen.
    pub fn init(&mut self, background: Rgb565) -> Result<(), HalError> {
        self.select(true)?;
        self.delay.delay_ms(1);
        self.write_command(cmd::SLEEP_OUT)?;
        self.delay.delay_ms(120);

        for (command, words) in INIT_SEQUENCE {
            self.write_command(*command)?;
            for (value, bits) in words.iter() {
                self.write_bits(*value, *bits)?;
            }
        }
        self.write_command(cmd::DISPLAY_ON)?;
        self.select(false)?;

        info!("lcd ready");
        let screen = self.bounding_box();
        self.fill_window(&screen, background)
    }

    pub fn release(self) -> (LcdPins<P>, D) {
        (self.pins, self.delay)
    }

    fn select(&mut self, active: bool) -> Result<(), HalError> {
        let result = if active {
            self.pins.cs.set_low()
        } else {
            self.pins.cs.set_high()
        };
        result.map_err(|_| HalError::GpioError)
    }

    /// Shift `bits` bits of `value` out, MSB first, sampled on the rising edge.
    fn write_bits(&mut self, value: u32, bits: u8) -> Result<(), HalError> {
        for bit in (0..bits).rev() {
            let result = if value & (1 << bit) != 0 {
                self.pins.sda.set_high()
            } else {
                self.pins.sda.set_low()
            };
            result.map_err(|_| HalError::GpioError)?;
            self.pins.sck.set_high().map_err(|_| HalError::GpioError)?;
            self.pins.sck.set_low().map_err(|_| HalError::GpioError)?;
        }
        Ok(())
    }

    fn write_command(&mut self, command: u8) -> Result<(), HalError> {
        self.pins.a0.set_low().map_err(|_| HalError::GpioError)?;
        self.write_bits(u32::from(command), 8)?;
        self.pins.a0.set_high().map_err(|_| HalError::GpioError)
    }

    /// Open an inclusive address window and start a memory write.
    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), HalError> {
        self.write_command(cmd::COLUMN_ADDRESS)?;
        self.write_bits(u32::from(x0), 16)?;
        self.write_bits(u32::from(x1), 16)?;
        self.write_command(cmd::ROW_ADDRESS)?;
        self.write_bits(u32::from(y0), 16)?;
        self.write_bits(u32::from(y1), 16)?;
        self.write_command(cmd::MEMORY_WRITE)
    }

    fn write_pixel(&mut self, color: Rgb565) -> Result<(), HalError> {
        self.write_bits(u32::from(RawU16::from(color).into_inner()), 16)
    }

    fn fill_window(&mut self, area: &Rectangle, color: Rgb565) -> Result<(), HalError> {
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };

        self.select(true)?;
        self.set_window(
            area.top_left.x as u16,
            area.top_left.y as u16,
            bottom_right.x as u16,
            bottom_right.y as u16,
        )?;
        for _ in 0..area.size.width * area.size.height {
            self.write_pixel(color)?;
        }
        self.select(false)
    }
}

impl<P, D> OriginDimensions for St7735<P, D> {
    fn size(&self) -> Size {
        Size::new(LCD_WIDTH, LCD_HEIGHT)
    }
}

impl<P, D> DrawTarget for St7735<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    type Color = Rgb565;
    type Error = HalError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.bounding_box();
        for Pixel(point, color) in pixels {
            if bounds.contains(point) {
                self.fill_window(&Rectangle::new(point, Size::new(1, 1)), color)?;
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_window(area, color)
    }
}
