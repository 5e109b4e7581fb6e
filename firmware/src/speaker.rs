//! Speaker on PB7, square wave from TIM4 channel 2

use fretboard_core::hal::ToneGenerator;
use fretboard_core::types::Pitch;
use stm32f4::stm32f411::{tim3, RCC, TIM4};

use crate::board::HSI_HZ;
use crate::gpio::{GpioPin, Port, Pull};

const TIM4_AF: u8 = 2;
/// OC2M = PWM mode 1, OC2PE
const CCMR1_OC2_PWM1: u32 = (0b110 << 12) | (1 << 11);
const CCER_CC2E: u32 = 1 << 4;

fn timer() -> &'static tim3::RegisterBlock {
    // SAFETY: TIM4 is only driven from the foreground through `Speaker`
    unsafe { &*TIM4::ptr() }
}

pub struct Speaker {
    _private: (),
}

impl Speaker {
    /// Configure the timer silent, tuned to A4.
    pub fn init() -> Self {
        Port::B.enable_clock();
        // SAFETY: enable bits are only ever set
        unsafe { &*RCC::ptr() }
            .apb1enr
            .modify(|_, w| w.tim4en().set_bit());
        GpioPin::new(Port::B, 7).into_alternate(TIM4_AF, Pull::None);

        let tim = timer();
        // SAFETY: channel 2 output compare setup, valid encodings
        unsafe {
            tim.psc.write(|w| w.bits(0));
            tim.ccmr1_output().write(|w| w.bits(CCMR1_OC2_PWM1));
            tim.ccer.write(|w| w.bits(CCER_CC2E));
        }
        tim.cr1.write(|w| w.arpe().set_bit());

        let mut speaker = Self { _private: () };
        speaker.set_pitch(Pitch::A4);
        tim.egr.write(|w| w.ug().set_bit());
        speaker
    }
}

impl ToneGenerator for Speaker {
    fn set_pitch(&mut self, pitch: Pitch) {
        let reload = u32::from(pitch.timer_reload(HSI_HZ));
        let tim = timer();
        // SAFETY: reload is 16-bit; 50% duty
        unsafe {
            tim.arr.write(|w| w.bits(reload));
            tim.ccr2.write(|w| w.bits(reload / 2));
        }
    }

    fn tone_on(&mut self) {
        timer().cr1.modify(|_, w| w.cen().set_bit());
    }

    fn tone_off(&mut self) {
        timer().cr1.modify(|_, w| w.cen().clear_bit());
    }
}
