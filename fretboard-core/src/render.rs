//! Board renderer over any embedded-graphics RGB565 display

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::{raw::RawU16, Rgb565},
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use heapless::String;

use crate::hal::DrawService;
use crate::types::{Column, COLUMNS};

/// Lane colors, left to right: red, yellow, green, blue.
const NOTE_COLORS: [u16; COLUMNS] = [0xC000, 0xD680, 0x0D41, 0x027F];

pub const BACKGROUND: Rgb565 = Rgb565::BLACK;
const GRID: Rgb565 = Rgb565::new(12, 24, 12);

fn lane_color(column: Column) -> Rgb565 {
    Rgb565::from(RawU16::new(NOTE_COLORS[column.index()]))
}

/// Pixel geometry of the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoardLayout {
    pub width: u32,
    pub height: u32,
    /// First board row; everything above belongs to the score bar.
    pub top: i32,
    pub note_height: u32,
    /// Top edge of the fret markers, equal to the game's hit line.
    pub fret_y: i32,
}

impl BoardLayout {
    /// 128x160 ST7735 panel.
    pub const LCD: BoardLayout = BoardLayout {
        width: 128,
        height: 160,
        top: 12,
        note_height: 20,
        fret_y: 130,
    };

    pub fn lane_width(&self) -> u32 {
        self.width / COLUMNS as u32
    }

    pub fn lane_x(&self, column: Column) -> i32 {
        (self.lane_width() * column.index() as u32) as i32
    }

    pub fn board_area(&self) -> Rectangle {
        let height = self.height.saturating_sub(self.top.max(0) as u32);
        Rectangle::new(Point::new(0, self.top), Size::new(self.width, height))
    }

    pub fn note_area(&self, column: Column, y: i32) -> Rectangle {
        Rectangle::new(
            Point::new(self.lane_x(column) + 1, y),
            Size::new(self.lane_width().saturating_sub(2), self.note_height),
        )
    }

    pub fn fret_area(&self, column: Column) -> Rectangle {
        Rectangle::new(
            Point::new(self.lane_x(column), self.fret_y),
            Size::new(self.lane_width(), self.note_height),
        )
    }

    fn score_bar(&self) -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(self.width, self.top.max(0) as u32))
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::LCD
    }
}

/// Draws the game board on `D`.
///
/// Drawing errors are counted, not propagated; the game never waits on the
/// display.
pub struct BoardRenderer<D> {
    display: D,
    layout: BoardLayout,
    pressed: [bool; COLUMNS],
    score: u32,
    draw_errors: u32,
}

impl<D> BoardRenderer<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(display: D, layout: BoardLayout) -> Self {
        Self {
            display,
            layout,
            pressed: [false; COLUMNS],
            score: 0,
            draw_errors: 0,
        }
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn draw_errors(&self) -> u32 {
        self.draw_errors
    }

    pub fn into_inner(self) -> D {
        self.display
    }

    fn record<T, E>(&mut self, result: Result<T, E>) {
        if result.is_err() {
            self.draw_errors = self.draw_errors.wrapping_add(1);
        }
    }

    /// Fill `area`, clipped to the board.
    fn fill(&mut self, area: Rectangle, color: Rgb565) {
        let board = self.layout.board_area();
        let result = area
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut self.display.clipped(&board));
        self.record(result);
    }

    fn draw_fret(&mut self, column: Column) {
        let area = self.layout.fret_area(column);
        if self.pressed[column.index()] {
            self.fill(area, lane_color(column));
        } else {
            self.fill(area, BACKGROUND);
            let board = self.layout.board_area();
            let result = area
                .into_styled(PrimitiveStyle::with_stroke(GRID, 1))
                .draw(&mut self.display.clipped(&board));
            self.record(result);
        }
    }

    fn draw_lane_divider(&mut self, column: Column) {
        let x = self.layout.lane_x(column);
        if x == 0 {
            return;
        }
        let board = self.layout.board_area();
        let bottom = board.bottom_right().map(|p| p.y).unwrap_or(self.layout.top);
        let result = Line::new(Point::new(x, self.layout.top), Point::new(x, bottom))
            .into_styled(PrimitiveStyle::with_stroke(GRID, 1))
            .draw(&mut self.display.clipped(&board));
        self.record(result);
    }
}

impl<D> DrawService for BoardRenderer<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    fn draw_note_at(&mut self, column: Column, y: i32) {
        let area = self.layout.note_area(column, y);
        self.fill(area, lane_color(column));
    }

    fn erase_note_at(&mut self, column: Column, y: i32) {
        let area = self.layout.note_area(column, y);
        self.fill(area, BACKGROUND);
        if !area.intersection(&self.layout.fret_area(column)).is_zero_sized() {
            self.draw_fret(column);
        }
    }

    fn move_note_vertical(&mut self, column: Column, old_y: i32, delta_y: i32) {
        self.erase_note_at(column, old_y);
        self.draw_note_at(column, old_y.saturating_add(delta_y));
    }

    fn press_fret_visual(&mut self, column: Column) {
        self.pressed[column.index()] = true;
        self.draw_fret(column);
    }

    fn release_fret_visual(&mut self, column: Column) {
        self.pressed[column.index()] = false;
        self.draw_fret(column);
    }

    fn is_fret_visually_pressed(&self, column: Column) -> bool {
        self.pressed[column.index()]
    }

    fn draw_score(&mut self, score: u32) {
        self.score = score;
        let bar = self.layout.score_bar();
        if bar.is_zero_sized() {
            return;
        }
        let result = bar
            .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
            .draw(&mut self.display);
        self.record(result);

        let mut text: String<16> = String::new();
        let _ = write!(text, "{}", score);
        let style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
        let result = Text::with_baseline(&text, Point::new(1, 1), style, Baseline::Top)
            .draw(&mut self.display.clipped(&bar));
        self.record(result);
    }

    fn draw_board(&mut self) {
        let result = self.display.clear(BACKGROUND);
        self.record(result);
        for column in Column::ALL {
            self.draw_lane_divider(column);
            self.draw_fret(column);
        }
        self.draw_score(self.score);
    }
}
