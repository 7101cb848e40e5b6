//! Card-type detection, init handshake, and sector I/O (§4.1).

use super::command::*;
use super::registers::{Cid, Csd};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hal::Hal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Mmc,
    SdV1,
    SdV2,
    Sdhc,
    Sdxc,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Mmc => "MMC",
            CardType::SdV1 => "SD v1.x",
            CardType::SdV2 => "SD v2.0",
            CardType::Sdhc => "SDHC",
            CardType::Sdxc => "SDXC",
        }
    }
}

/// Read-only snapshot of card state, mirroring `libresd_sd_get_info`.
#[derive(Debug, Clone, Copy)]
pub struct CardInfo {
    pub card_type: CardType,
    pub capacity_bytes: u64,
    pub sector_count: u32,
    pub block_size: u16,
    pub block_addressed: bool,
    pub read_count: u32,
    pub write_count: u32,
    pub error_count: u32,
}

/// An initialized SD card reachable over SPI via `H`. Owns no buffers beyond
/// what the caller supplies to `read_sector`/`write_sector`.
pub struct SdCard<H: Hal> {
    hal: H,
    config: Config,
    card_type: CardType,
    block_addressed: bool,
    capacity_sectors: u32,
    cid: Cid,
    csd: Csd,
    read_count: u32,
    write_count: u32,
    error_count: u32,
}

impl<H: Hal> SdCard<H> {
    /// Runs the full init sequence (§4.1 "Initialization state machine").
    pub fn init(mut hal: H, config: Config) -> Result<Self> {
        hal.spi_init(config.spi_init_hz);

        // POWER_UP -> IDLE: >=74 dummy clocks with CS deasserted.
        hal.cs_deassert();
        for _ in 0..10 {
            hal.spi_transfer_byte(0xFF);
        }

        let mut card = SdCard {
            hal,
            config,
            card_type: CardType::SdV1,
            block_addressed: false,
            capacity_sectors: 0,
            cid: Cid::from_bytes([0; 16]),
            csd: Csd::from_bytes([0; 16]),
            read_count: 0,
            write_count: 0,
            error_count: 0,
        };

        let r1 = card.cmd(CMD0, 0)?;
        if r1 != R1_IDLE {
            return Err(Error::InitFailed);
        }

        // IDLE -> CHECK_V2.
        let is_v2 = match card.cmd(CMD8, 0x1AA) {
            Ok(R1_IDLE) => {
                let echo = card.read_r7_trailer()?;
                if echo & 0xFFF != 0x1AA {
                    return Err(Error::Voltage);
                }
                true
            }
            Ok(r1) if r1 & R1_ILLEGAL_CMD != 0 => false,
            Ok(_) => return Err(Error::InitFailed),
            Err(e) => return Err(e),
        };

        // CHECK_V2 -> READY: poll ACMD41 (or CMD1 fallback for MMC).
        let start = card.hal.now_ms();
        let mut is_mmc = false;
        loop {
            let r1 = card.acmd(ACMD41, if is_v2 { 0x4000_0000 } else { 0 });
            match r1 {
                Ok(0x00) => break,
                Ok(r1) if r1 & R1_ILLEGAL_CMD != 0 && !is_mmc => {
                    is_mmc = true;
                }
                _ => {}
            }
            if is_mmc {
                if card.cmd(CMD1, 0)? == 0x00 {
                    break;
                }
            }
            if card.hal.now_ms().wrapping_sub(start) >= card.config.init_timeout_ms {
                return Err(Error::Timeout);
            }
            hal_delay(&mut card.hal, 1);
        }

        card.card_type = if is_mmc {
            CardType::Mmc
        } else if is_v2 {
            CardType::SdV2
        } else {
            CardType::SdV1
        };

        // READY -> CAPACITY: SDHC detection via OCR.
        if is_v2 {
            let r1 = card.cmd(CMD58, 0)?;
            if r1 != 0x00 {
                return Err(Error::InitFailed);
            }
            let ocr = card.read_r3_trailer()?;
            if ocr & OCR_CCS != 0 {
                card.card_type = CardType::Sdhc;
                card.block_addressed = true;
            }
        }

        // CAPACITY -> BLOCK_SIZE.
        if !card.block_addressed {
            if card.cmd(CMD16, 512)? != 0x00 {
                return Err(Error::InitFailed);
            }
        }

        // Read CSD/CID, derive capacity, possibly upgrade to SDXC.
        let csd_raw = card.read_register(CMD9)?;
        card.csd = Csd::from_bytes(csd_raw);
        let cid_raw = card.read_register(CMD10)?;
        card.cid = Cid::from_bytes(cid_raw);

        let capacity_bytes = card.csd.capacity_bytes();
        if capacity_bytes > 32 * 1024 * 1024 * 1024 {
            card.card_type = CardType::Sdxc;
        }
        card.capacity_sectors = card.csd.capacity_sectors() as u32;

        let fast_hz = card.config.clamp_speed(card.config.spi_fast_hz);
        card.hal.spi_init(fast_hz);

        #[cfg(feature = "log")]
        log::debug!(
            "SD card initialized: {} ({} sectors)",
            card.card_type.as_str(),
            card.capacity_sectors
        );

        Ok(card)
    }

    /// Direct access to the HAL, for callers (the volume layer) that need
    /// platform services the card itself doesn't wrap, such as the RTC.
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn info(&self) -> CardInfo {
        CardInfo {
            card_type: self.card_type,
            capacity_bytes: self.csd.capacity_bytes(),
            sector_count: self.capacity_sectors,
            block_size: 512,
            block_addressed: self.block_addressed,
            read_count: self.read_count,
            write_count: self.write_count,
            error_count: self.error_count,
        }
    }

    pub fn cid(&self) -> Cid {
        self.cid
    }

    pub fn csd(&self) -> Csd {
        self.csd
    }

    /// Re-negotiates SPI speed, clamped to the configured maximum.
    pub fn set_speed(&mut self, speed_hz: u32) -> u32 {
        self.hal.spi_init(self.config.clamp_speed(speed_hz))
    }

    fn addr_arg(&self, sector: u32) -> u32 {
        if self.block_addressed {
            sector
        } else {
            sector.wrapping_mul(512)
        }
    }

    /// Sends a command frame and returns the R1 response byte.
    fn cmd(&mut self, cmd: u8, arg: u32) -> Result<u8> {
        let frame = CommandFrame::new(cmd, arg);
        self.hal.cs_assert();
        for &b in &frame.bytes {
            self.hal.spi_transfer_byte(b);
        }
        let r1 = self.poll_r1()?;
        Ok(r1)
    }

    /// Sends CMD55 then the given ACMD; CMD55 failure short-circuits.
    fn acmd(&mut self, cmd: u8, arg: u32) -> Result<u8> {
        let r1 = self.cmd(CMD55, 0)?;
        self.end_command();
        if r1 & !R1_IDLE != 0 {
            return Err(Error::Command(r1));
        }
        let r1 = self.cmd(cmd, arg)?;
        self.end_command();
        Ok(r1)
    }

    fn poll_r1(&mut self) -> Result<u8> {
        for _ in 0..8 {
            let b = self.hal.spi_transfer_byte(0xFF);
            if b & 0x80 == 0 {
                return Ok(b);
            }
        }
        Err(Error::Timeout)
    }

    fn read_r7_trailer(&mut self) -> Result<u32> {
        let v = self.read_trailer_u32();
        self.end_command();
        Ok(v)
    }

    fn read_r3_trailer(&mut self) -> Result<u32> {
        let v = self.read_trailer_u32();
        self.end_command();
        Ok(v)
    }

    fn read_trailer_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        for b in buf.iter_mut() {
            *b = self.hal.spi_transfer_byte(0xFF);
        }
        u32::from_be_bytes(buf)
    }

    /// Deasserts CS and ships one idle byte, per §4.1 "Chip-select discipline".
    fn end_command(&mut self) {
        self.hal.cs_deassert();
        self.hal.spi_transfer_byte(0xFF);
    }

    /// Reads a 16-byte register via CMD9/CMD10, which respond with a data
    /// block framed exactly like a single-block read.
    fn read_register(&mut self, cmd: u8) -> Result<[u8; 16]> {
        let r1 = self.cmd(cmd, 0)?;
        if r1 != 0x00 {
            self.end_command();
            return Err(Error::Command(r1));
        }
        self.wait_token(self.config.read_timeout_ms)?;
        let mut buf = [0u8; 16];
        for b in buf.iter_mut() {
            *b = self.hal.spi_transfer_byte(0xFF);
        }
        self.hal.spi_transfer_byte(0xFF);
        self.hal.spi_transfer_byte(0xFF);
        self.end_command();
        Ok(buf)
    }

    fn wait_token(&mut self, timeout_ms: u32) -> Result<u8> {
        let start = self.hal.now_ms();
        loop {
            let b = self.hal.spi_transfer_byte(0xFF);
            if b != 0xFF {
                return Ok(b);
            }
            if self.hal.now_ms().wrapping_sub(start) >= timeout_ms {
                return Err(Error::Timeout);
            }
        }
    }

    fn wait_ready(&mut self, timeout_ms: u32) -> Result<()> {
        let start = self.hal.now_ms();
        loop {
            if self.hal.spi_transfer_byte(0xFF) == 0xFF {
                return Ok(());
            }
            if self.hal.now_ms().wrapping_sub(start) >= timeout_ms {
                return Err(Error::Timeout);
            }
        }
    }

    /// Single-block read (CMD17).
    pub fn read_sector(&mut self, sector: u32, buf: &mut [u8; 512]) -> Result<()> {
        let arg = self.addr_arg(sector);
        let r1 = self.cmd(CMD17, arg)?;
        if r1 != 0x00 {
            self.end_command();
            self.error_count += 1;
            return Err(Error::Command(r1));
        }
        let result = self.receive_block(buf);
        self.end_command();
        if result.is_ok() {
            self.read_count += 1;
        } else {
            self.error_count += 1;
        }
        result
    }

    /// Multi-block read (CMD18), stopped with CMD12.
    pub fn read_sectors(&mut self, sector: u32, buf: &mut [u8], count: u32) -> Result<()> {
        if buf.len() < count as usize * 512 {
            return Err(Error::InvalidParameter);
        }
        let arg = self.addr_arg(sector);
        let r1 = self.cmd(CMD18, arg)?;
        if r1 != 0x00 {
            self.end_command();
            return Err(Error::Command(r1));
        }
        let mut result = Ok(());
        for i in 0..count as usize {
            let chunk: &mut [u8; 512] = (&mut buf[i * 512..(i + 1) * 512]).try_into().unwrap();
            if let Err(e) = self.receive_block(chunk) {
                result = Err(e);
                break;
            }
        }
        let _ = self.cmd(CMD12, 0);
        // After STOP_TRANSMISSION the card releases MISO; wait for it.
        let _ = self.wait_ready(self.config.read_timeout_ms);
        self.end_command();
        if result.is_ok() {
            self.read_count += count;
        } else {
            self.error_count += 1;
        }
        result
    }

    fn receive_block(&mut self, buf: &mut [u8; 512]) -> Result<()> {
        let token = self.wait_token(self.config.read_timeout_ms)?;
        if token != TOKEN_SINGLE {
            return Err(Error::ReadError);
        }
        for b in buf.iter_mut() {
            *b = self.hal.spi_transfer_byte(0xFF);
        }
        self.hal.spi_transfer_byte(0xFF);
        self.hal.spi_transfer_byte(0xFF);
        Ok(())
    }

    /// Single-block write (CMD24).
    pub fn write_sector(&mut self, sector: u32, buf: &[u8; 512]) -> Result<()> {
        if self.hal.write_protect() {
            return Err(Error::WriteProtected);
        }
        let arg = self.addr_arg(sector);
        let r1 = self.cmd(CMD24, arg)?;
        if r1 != 0x00 {
            self.end_command();
            self.error_count += 1;
            return Err(Error::Command(r1));
        }
        self.hal.spi_transfer_byte(0xFF);
        let result = self.send_block(TOKEN_SINGLE, buf);
        self.end_command();
        if result.is_ok() {
            self.write_count += 1;
        } else {
            self.error_count += 1;
        }
        result
    }

    /// Multi-block write (CMD25), terminated with the stop token.
    pub fn write_sectors(&mut self, sector: u32, buf: &[u8], count: u32) -> Result<()> {
        if self.hal.write_protect() {
            return Err(Error::WriteProtected);
        }
        if buf.len() < count as usize * 512 {
            return Err(Error::InvalidParameter);
        }
        let _ = self.acmd(ACMD23, count);
        let arg = self.addr_arg(sector);
        let r1 = self.cmd(CMD25, arg)?;
        if r1 != 0x00 {
            self.end_command();
            return Err(Error::Command(r1));
        }
        self.hal.spi_transfer_byte(0xFF);
        let mut result = Ok(());
        for i in 0..count as usize {
            let chunk: &[u8; 512] = (&buf[i * 512..(i + 1) * 512]).try_into().unwrap();
            if let Err(e) = self.send_block(TOKEN_MULTI_WRITE, chunk) {
                result = Err(e);
                break;
            }
        }
        self.hal.spi_transfer_byte(TOKEN_STOP);
        let _ = self.wait_ready(self.config.write_timeout_ms);
        self.end_command();
        if result.is_ok() {
            self.write_count += count;
        } else {
            self.error_count += 1;
        }
        result
    }

    fn send_block(&mut self, token: u8, buf: &[u8; 512]) -> Result<()> {
        self.hal.spi_transfer_byte(token);
        for &b in buf.iter() {
            self.hal.spi_transfer_byte(b);
        }
        self.hal.spi_transfer_byte(0xFF);
        self.hal.spi_transfer_byte(0xFF);
        let resp = self.hal.spi_transfer_byte(0xFF);
        if resp & DATA_RESPONSE_MASK != DATA_RESPONSE_ACCEPTED {
            return Err(Error::WriteError);
        }
        self.wait_ready(self.config.write_timeout_ms)
    }

    /// Erases the sector range `[start, end]` (CMD32/CMD33/CMD38).
    pub fn erase(&mut self, start_sector: u32, end_sector: u32) -> Result<()> {
        if self.hal.write_protect() {
            return Err(Error::WriteProtected);
        }
        let start_arg = self.addr_arg(start_sector);
        let end_arg = self.addr_arg(end_sector);
        if self.cmd(CMD32, start_arg)? != 0x00 {
            self.end_command();
            return Err(Error::EraseError);
        }
        self.end_command();
        if self.cmd(CMD33, end_arg)? != 0x00 {
            self.end_command();
            return Err(Error::EraseError);
        }
        self.end_command();
        if self.cmd(CMD38, 0)? != 0x00 {
            self.end_command();
            return Err(Error::EraseError);
        }
        let result = self.wait_ready(self.config.erase_timeout_ms);
        self.end_command();
        result.map_err(|_| Error::EraseError)
    }
}

fn hal_delay<H: Hal>(hal: &mut H, ms: u32) {
    hal.delay_ms(ms);
}
