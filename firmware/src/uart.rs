//! USART2 on PA2 (TX) / PA3 (RX), 9600 8N1, transmit through DMA1 stream 6

use core::cell::RefCell;

use critical_section::Mutex;
use fretboard_core::hal::{DebugSink, TxDma};
use fretboard_core::serial::AsyncSerial;
use stm32f4::stm32f411::{dma2, usart1, DMA1, RCC, USART2};

use crate::board::HSI_HZ;
use crate::gpio::{GpioPin, Port, Pull};

pub const BAUD_RATE: u32 = 9600;

const USART2_AF: u8 = 7;
/// USART2_TX request on DMA1 stream 6
const TX_CHANNEL: u32 = 4;
const TX_STREAM: usize = 6;
/// Every stream 6 flag in HIFCR
const HIFCR_STREAM6: u32 = 0b11_1101 << 16;
const USART2_BRR: u32 = (HSI_HZ + BAUD_RATE / 2) / BAUD_RATE;

/// Stream CR: channel select, high priority, memory increment,
/// memory-to-peripheral, transfer-complete interrupt. EN stays clear.
const TX_STREAM_CR: u32 = (TX_CHANNEL << 25) | (0b10 << 16) | (1 << 10) | (0b01 << 6) | (1 << 4);

const _: () = assert!(USART2_BRR == 1667);
const _: () = assert!(TX_STREAM_CR == 0x0802_0450);

// SAFETY (both): USART2 transmit and DMA1 stream 6 are owned by the
// `SERIAL` static; the receive side only reads SR and DR.
fn usart() -> &'static usart1::RegisterBlock {
    unsafe { &*USART2::ptr() }
}

fn dma() -> &'static dma2::RegisterBlock {
    unsafe { &*DMA1::ptr() }
}

/// Transmit half of USART2 driven by DMA.
pub struct Usart2Dma {
    _private: (),
}

impl Usart2Dma {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Bring up the pins, the USART and the DMA stream. The DMA1_STREAM6
    /// interrupt still has to be unmasked by the caller.
    pub fn init(&mut self) {
        Port::A.enable_clock();
        // SAFETY: enable bits are only ever set
        let rcc = unsafe { &*RCC::ptr() };
        rcc.ahb1enr.modify(|_, w| w.dma1en().set_bit());
        rcc.apb1enr.modify(|_, w| w.usart2en().set_bit());

        GpioPin::new(Port::A, 2).into_alternate(USART2_AF, Pull::None);
        GpioPin::new(Port::A, 3).into_alternate(USART2_AF, Pull::Up);

        let usart = usart();
        usart.cr1.write(|w| w.re().set_bit().te().set_bit());
        // SAFETY: reset value for CR2; BRR fits the 16-bit divider
        unsafe {
            usart.cr2.write(|w| w.bits(0));
            usart.brr.write(|w| w.bits(USART2_BRR));
        }
        usart.cr3.write(|w| w.dmat().set_bit());

        let dma = dma();
        let stream = &dma.st[TX_STREAM];
        let data_register = &usart.dr as *const _ as u32;
        // SAFETY: stream disabled while it is configured
        unsafe {
            stream.cr.write(|w| w.bits(TX_STREAM_CR));
            stream.par.write(|w| w.bits(data_register));
            dma.hifcr.write(|w| w.bits(HIFCR_STREAM6));
        }

        usart.cr1.modify(|_, w| w.ue().set_bit());
    }

    /// Whether stream 6 reported transfer complete.
    pub fn transfer_complete() -> bool {
        dma().hisr.read().tcif6().bit_is_set()
    }

    /// Poll for a received byte.
    pub fn read_byte() -> Option<u8> {
        let usart = usart();
        if usart.sr.read().rxne().bit_is_set() {
            Some(usart.dr.read().dr().bits() as u8)
        } else {
            None
        }
    }
}

impl Default for Usart2Dma {
    fn default() -> Self {
        Self::new()
    }
}

impl TxDma for Usart2Dma {
    fn start(&mut self, bytes: &[u8]) {
        let stream = &dma().st[TX_STREAM];
        // SAFETY: `AsyncSerial` keeps `bytes` alive until transfer complete
        unsafe {
            stream.m0ar.write(|w| w.bits(bytes.as_ptr() as u32));
            stream.ndtr.write(|w| w.bits(bytes.len() as u32));
        }
        stream.cr.modify(|_, w| w.en().set_bit());
    }

    fn acknowledge_complete(&mut self) {
        // SAFETY: write-one-to-clear, stream 6 flags only
        dma().hifcr.write(|w| unsafe { w.bits(HIFCR_STREAM6) });
    }
}

pub type Serial = AsyncSerial<Usart2Dma>;

/// The transmit queue, shared by the foreground and the DMA interrupt.
pub static SERIAL: Mutex<RefCell<Serial>> = Mutex::new(RefCell::new(AsyncSerial::new(Usart2Dma::new())));

pub fn init_serial() {
    critical_section::with(|cs| SERIAL.borrow_ref_mut(cs).dma_mut().init());
}

/// DMA1_STREAM6 interrupt body.
pub fn on_dma_interrupt() {
    if Usart2Dma::transfer_complete() {
        critical_section::with(|cs| {
            SERIAL.borrow_ref_mut(cs).on_transfer_complete();
        });
    }
}

/// [`DebugSink`] handle onto [`SERIAL`] for code running outside the
/// DMA interrupt.
#[derive(Copy, Clone, Debug, Default)]
pub struct SharedSerial;

impl DebugSink for SharedSerial {
    fn send_static(&mut self, bytes: &'static [u8]) {
        critical_section::with(|cs| SERIAL.borrow_ref_mut(cs).send_static(bytes));
    }

    fn send_copy(&mut self, bytes: &[u8]) {
        critical_section::with(|cs| DebugSink::send_copy(&mut *SERIAL.borrow_ref_mut(cs), bytes));
    }
}
