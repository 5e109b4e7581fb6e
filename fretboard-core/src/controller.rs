//! State shared between interrupt handlers and the foreground loop

use portable_atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::types::{ConfigError, HeldKeyMask, KeyCode, TickConfig, MAX_DIVIDER_SHIFT};

/// Live "currently held" key mask.
///
/// Written wholesale by the scanner interrupt once per scan, read-only
/// everywhere else.
pub struct HeldKeys {
    mask: AtomicU16,
}

impl HeldKeys {
    pub const fn new() -> Self {
        Self {
            mask: AtomicU16::new(0),
        }
    }

    /// Publish a new scan result (scanner interrupt only).
    pub fn store(&self, mask: HeldKeyMask) {
        self.mask.store(mask.bits(), Ordering::Release);
    }

    pub fn load(&self) -> HeldKeyMask {
        HeldKeyMask::from_bits(self.mask.load(Ordering::Acquire))
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.load().contains(key)
    }
}

impl Default for HeldKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Game tick pulses produced by the tick timer interrupt.
///
/// The interrupt only counts; the foreground loop drains the count and turns
/// it into a single `advance_ticks` call, which keeps the game state
/// single-writer.
pub struct TickPulses {
    pending: AtomicU32,
    interrupts: AtomicU32,
    divider_shift: AtomicU8,
    running: AtomicBool,
}

impl TickPulses {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
            interrupts: AtomicU32::new(0),
            divider_shift: AtomicU8::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_config(config: TickConfig) -> Self {
        let pulses = Self::new();
        pulses.divider_shift.store(config.divider_shift, Ordering::Relaxed);
        pulses
    }

    /// Count one timer interrupt (tick timer interrupt only).
    ///
    /// Emits a pulse on the first of every `2^divider_shift` interrupts while
    /// running.
    pub fn on_timer_interrupt(&self) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }
        let mask = (1u32 << self.divider_shift.load(Ordering::Relaxed)) - 1;
        let count = self.interrupts.load(Ordering::Relaxed);
        if count & mask == 0 {
            self.pending.fetch_add(1, Ordering::Release);
        }
        self.interrupts.store(count.wrapping_add(1) & mask, Ordering::Relaxed);
    }

    /// Take every pulse counted since the last drain.
    pub fn drain(&self) -> u32 {
        self.pending.swap(0, Ordering::AcqRel)
    }

    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    /// Flip between falling and paused; returns the new state.
    pub fn toggle_running(&self) -> bool {
        !self.running.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn divider_shift(&self) -> u8 {
        self.divider_shift.load(Ordering::Relaxed)
    }

    pub fn set_divider_shift(&self, shift: u8) -> Result<(), ConfigError> {
        let config = TickConfig::new(shift)?;
        self.divider_shift.store(config.divider_shift, Ordering::Relaxed);
        self.interrupts.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Halve the divider. Returns false when already at full speed.
    pub fn speed_up(&self) -> bool {
        match self.divider_shift() {
            0 => false,
            shift => self.set_divider_shift(shift - 1).is_ok(),
        }
    }

    /// Double the divider. Returns false when already at the slowest pace.
    pub fn slow_down(&self) -> bool {
        match self.divider_shift() {
            MAX_DIVIDER_SHIFT => false,
            shift => self.set_divider_shift(shift + 1).is_ok(),
        }
    }
}

impl Default for TickPulses {
    fn default() -> Self {
        Self::new()
    }
}
