//! Hardware-abstraction boundary (C1, external collaborator).
//!
//! Mirrors `libresd_hal.h`'s function surface one-for-one. Modelled as a
//! trait passed explicitly into [`crate::sd::SdCard::init`] rather than weak
//! symbols or function pointers, per §9's "Dynamic dispatch" note.

/// Calendar time as FAT packs it: no timezone, 2-second resolution on the
/// seconds field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// 1980-01-01 00:00:00, the FAT epoch. A HAL with no RTC may return this.
    pub const EPOCH: DateTime = DateTime {
        year: 1980,
        month: 1,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    };
}

/// The capabilities the core needs from the host platform. Everything here
/// is blocking: there is no implicit background activity (§5).
pub trait Hal {
    /// Sets the SPI clock and returns the speed actually achieved.
    fn spi_init(&mut self, speed_hz: u32) -> u32;

    /// Full-duplex single-byte transfer.
    fn spi_transfer_byte(&mut self, tx: u8) -> u8;

    /// Full-duplex bulk transfer. `tx = None` means ship `0xFF` for every
    /// byte (used for reads); `rx = None` discards received bytes (used for
    /// writes, and for the dummy CRC bytes on both paths).
    fn spi_transfer_bulk(&mut self, tx: Option<&[u8]>, mut rx: Option<&mut [u8]>, len: usize) {
        for i in 0..len {
            let tx_byte = tx.map(|b| b[i]).unwrap_or(0xFF);
            let rx_byte = self.spi_transfer_byte(tx_byte);
            if let Some(r) = rx.as_deref_mut() {
                r[i] = rx_byte;
            }
        }
    }

    fn cs_assert(&mut self);
    fn cs_deassert(&mut self);

    fn delay_ms(&mut self, ms: u32);

    /// Free-running millisecond counter. Callers perform modular subtraction
    /// so a wraparound after ~49 days is not a correctness hazard (§5).
    fn now_ms(&mut self) -> u32;

    /// `true` if a card is physically present. Default: always present.
    fn card_detect(&mut self) -> bool {
        true
    }

    /// `true` if the card's write-protect switch is engaged. Default: never.
    fn write_protect(&mut self) -> bool {
        false
    }

    /// Wall-clock time for directory-entry timestamps. Default: FAT epoch.
    fn datetime(&mut self) -> DateTime {
        DateTime::EPOCH
    }
}
