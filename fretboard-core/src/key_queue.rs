//! Key event queue between the scanner interrupt and the foreground loop
//!
//! A fixed ring of key codes with the read cursor and fill level packed into
//! one atomic word. The producer (scanner interrupt) never blocks: on a full
//! ring it overwrites the oldest key. The consumer publishes each pop with a
//! compare-and-swap and gives up after a bounded number of conflicts.

use portable_atomic::{AtomicU32, AtomicU8, Ordering};

use crate::types::KeyCode;

/// Default capacity used by the firmware.
pub const KEY_QUEUE_CAPACITY: usize = 128;

/// Conflicting publishes tolerated by [`KeyEventQueue::try_dequeue`].
pub const DEQUEUE_RETRIES: usize = 32;

const HALF_BITS: u32 = 16;
const HALF_MASK: u32 = (1 << HALF_BITS) - 1;

/// Start index and fill level of the ring, packed into one word.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Cursor {
    pub start: u16,
    pub size: u16,
}

impl Cursor {
    pub const fn pack(self) -> u32 {
        (self.start as u32) | ((self.size as u32) << HALF_BITS)
    }

    pub const fn unpack(word: u32) -> Self {
        Self {
            start: (word & HALF_MASK) as u16,
            size: (word >> HALF_BITS) as u16,
        }
    }
}

const _: () = assert!(Cursor::unpack(Cursor { start: 0xFFFF, size: 0x8000 }.pack()).size == 0x8000);
const _: () = assert!(Cursor::unpack(Cursor { start: 0xFFFF, size: 0 }.pack()).start == 0xFFFF);

/// Single-producer, single-consumer key ring.
pub struct KeyEventQueue<const N: usize> {
    slots: [AtomicU8; N],
    cursor: AtomicU32,
}

impl<const N: usize> KeyEventQueue<N> {
    const CAPACITY_OK: () = assert!(
        N.is_power_of_two() && N <= 1 << 15,
        "capacity must be a power of two that fits the packed cursor"
    );
    const MASK: usize = N - 1;
    #[allow(clippy::declare_interior_mutable_const)]
    const EMPTY_SLOT: AtomicU8 = AtomicU8::new(0xFF);

    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: [Self::EMPTY_SLOT; N],
            cursor: AtomicU32::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        Cursor::unpack(self.cursor.load(Ordering::Acquire)).size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a key (producer side only).
    ///
    /// On a full ring the oldest unread key is dropped and the start cursor
    /// advances, so the size saturates at `N`. Returns `true` when a key was
    /// dropped.
    pub fn enqueue(&self, key: KeyCode) -> bool {
        let mut word = self.cursor.load(Ordering::Acquire);
        loop {
            let cursor = Cursor::unpack(word);
            let start = cursor.start as usize;
            let size = cursor.size as usize;
            self.slots[(start + size) & Self::MASK].store(key.bits(), Ordering::Relaxed);

            let (next, dropped) = if size == N {
                let next = Cursor {
                    start: ((start + 1) & Self::MASK) as u16,
                    size: cursor.size,
                };
                (next, true)
            } else {
                let next = Cursor {
                    start: cursor.start,
                    size: cursor.size + 1,
                };
                (next, false)
            };

            // Only a consumer pop can race us here; recompute from its result.
            match self.cursor.compare_exchange_weak(
                word,
                next.pack(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if dropped {
                        warn!("key queue full, dropped oldest key");
                    }
                    return dropped;
                }
                Err(current) => word = current,
            }
        }
    }

    /// Pop the oldest key (consumer side only).
    ///
    /// Returns `None` when the ring is empty, or when the publish lost the
    /// race to the producer [`DEQUEUE_RETRIES`] times in a row. In the latter
    /// case the key stays queued for the next call.
    pub fn try_dequeue(&self) -> Option<KeyCode> {
        for _ in 0..DEQUEUE_RETRIES {
            let word = self.cursor.load(Ordering::Acquire);
            let cursor = Cursor::unpack(word);
            if cursor.size == 0 {
                return None;
            }
            let raw = self.slots[cursor.start as usize & Self::MASK].load(Ordering::Relaxed);
            let next = Cursor {
                start: ((cursor.start as usize + 1) & Self::MASK) as u16,
                size: cursor.size - 1,
            };
            if self
                .cursor
                .compare_exchange(word, next.pack(), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return KeyCode::from_bits(raw);
            }
        }
        trace!("key dequeue gave up after {} retries", DEQUEUE_RETRIES);
        None
    }

    /// Drop every queued key.
    pub fn clear(&self) {
        while self.try_dequeue().is_some() {}
    }
}

impl<const N: usize> Default for KeyEventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
