//! Game tick timer: TIM5 update interrupt every 10 ms

use stm32f4::stm32f411::{RCC, TIM5};

use crate::board::HSI_HZ;

/// 8 MHz timer clock
const TICK_PRESCALER: u32 = 1;
const TICK_RELOAD: u32 = 80_000 - 1;

const _: () = assert!((TICK_PRESCALER + 1) * (TICK_RELOAD + 1) == HSI_HZ / 100);

pub fn init_tick_timer() {
    // SAFETY: enable bits are only ever set; TIM5 belongs to this module
    let (rcc, tim) = unsafe { (&*RCC::ptr(), &*TIM5::ptr()) };
    rcc.apb1enr.modify(|_, w| w.tim5en().set_bit());
    tim.cr1.write(|w| w.urs().set_bit());
    // SAFETY: PSC is 16 bits, ARR 32 bits on TIM5
    tim.psc.write(|w| unsafe { w.bits(TICK_PRESCALER) });
    tim.arr.write(|w| unsafe { w.bits(TICK_RELOAD) });
    tim.egr.write(|w| w.ug().set_bit());
    tim.sr.modify(|_, w| w.uif().clear_bit());
    tim.dier.write(|w| w.uie().set_bit());
    tim.cr1.modify(|_, w| w.cen().set_bit());
}

/// Clear the update flag. Returns whether it was set.
pub fn take_tick_event() -> bool {
    // SAFETY: only the update flag is touched
    let tim = unsafe { &*TIM5::ptr() };
    let pending = tim.sr.read().uif().bit_is_set();
    if pending {
        tim.sr.modify(|_, w| w.uif().clear_bit());
    }
    pending
}
