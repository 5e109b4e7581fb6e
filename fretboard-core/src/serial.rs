//! Non-blocking serial transmit queue on top of a DMA channel
//!
//! At most one transfer is in flight. Sends issued while the channel is busy
//! wait in a FIFO that only the transfer-complete interrupt pops, so bytes
//! leave in exactly the order they were submitted.
//!
//! The transport hands addresses of its own buffers to the DMA channel, so
//! it must not move while a transfer is in flight. The firmware keeps it in
//! a `static`.

use crate::hal::{DebugSink, TxDma};

/// Pending sends the firmware queue holds.
pub const SEND_QUEUE_CAPACITY: usize = 64;
/// Longest message [`AsyncSerial::send_copy`] accepts.
pub const COPY_CAPACITY: usize = 64;

/// Serial transport errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Every pending slot is taken; the send was dropped
    QueueFull,
    /// Message longer than the copy buffers
    TooLong,
}

impl core::fmt::Display for SendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SendError::QueueFull => write!(f, "send queue full"),
            SendError::TooLong => write!(f, "message exceeds copy buffer"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SendError {}

#[derive(Copy, Clone, Debug)]
enum Pending {
    /// Caller-owned buffer that outlives the transfer
    Borrowed(&'static [u8]),
    /// Bytes copied into the slot storage of the same index
    Copied(usize),
}

/// DMA-backed transmit queue.
pub struct AsyncSerial<D, const N: usize = SEND_QUEUE_CAPACITY, const COPY: usize = COPY_CAPACITY> {
    dma: D,
    pending: [Pending; N],
    start: usize,
    size: usize,
    slots: [[u8; COPY]; N],
    /// Storage of the copied transfer currently in flight
    active: [u8; COPY],
    busy: bool,
    dropped: u32,
}

impl<D, const N: usize, const COPY: usize> AsyncSerial<D, N, COPY>
where
    D: TxDma,
{
    const CAPACITY_OK: () = assert!(N > 0 && COPY > 0, "queue and copy buffers must be non-empty");

    pub const fn new(dma: D) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            dma,
            pending: [Pending::Borrowed(&[]); N],
            start: 0,
            size: 0,
            slots: [[0; COPY]; N],
            active: [0; COPY],
            busy: false,
            dropped: 0,
        }
    }

    /// Transfer in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Sends waiting behind the one in flight.
    pub fn pending(&self) -> usize {
        self.size
    }

    /// Sends rejected because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// Send a buffer that lives for the whole program.
    ///
    /// Starts immediately when the channel is idle, otherwise queues.
    pub fn send(&mut self, bytes: &'static [u8]) -> Result<(), SendError> {
        if bytes.is_empty() {
            return Ok(());
        }
        if !self.busy {
            self.busy = true;
            self.dma.start(bytes);
            return Ok(());
        }
        let index = self.reserve()?;
        self.pending[index] = Pending::Borrowed(bytes);
        self.size += 1;
        Ok(())
    }

    /// Send a transient buffer. The bytes are copied before this returns,
    /// so the caller may reuse `bytes` right away.
    pub fn send_copy(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        if bytes.len() > COPY {
            self.dropped = self.dropped.wrapping_add(1);
            return Err(SendError::TooLong);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        if !self.busy {
            self.active[..bytes.len()].copy_from_slice(bytes);
            self.busy = true;
            self.dma.start(&self.active[..bytes.len()]);
            return Ok(());
        }
        let index = self.reserve()?;
        self.slots[index][..bytes.len()].copy_from_slice(bytes);
        self.pending[index] = Pending::Copied(bytes.len());
        self.size += 1;
        Ok(())
    }

    /// Index of the next free queue entry, counting a drop when full.
    fn reserve(&mut self) -> Result<usize, SendError> {
        if self.size == N {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("serial: send queue full");
            return Err(SendError::QueueFull);
        }
        Ok((self.start + self.size) % N)
    }

    /// Transfer-complete interrupt: start the next queued send, if any.
    ///
    /// Returns true when another transfer was started.
    pub fn on_transfer_complete(&mut self) -> bool {
        self.dma.acknowledge_complete();
        if self.size == 0 {
            self.busy = false;
            return false;
        }

        let index = self.start;
        self.start = (self.start + 1) % N;
        self.size -= 1;
        match self.pending[index] {
            Pending::Borrowed(bytes) => self.dma.start(bytes),
            Pending::Copied(len) => {
                // The slot is free for new sends from here on; transmit
                // from storage nobody else writes while busy.
                self.active[..len].copy_from_slice(&self.slots[index][..len]);
                self.dma.start(&self.active[..len]);
            }
        }
        true
    }
}

impl<D, const N: usize, const COPY: usize> DebugSink for AsyncSerial<D, N, COPY>
where
    D: TxDma,
{
    fn send_static(&mut self, bytes: &'static [u8]) {
        self.send(bytes).ok();
    }

    fn send_copy(&mut self, bytes: &[u8]) {
        AsyncSerial::send_copy(self, bytes).ok();
    }
}
