//! Tunables mirroring `libresd_config.h`. Unlike the C original these are a
//! plain struct rather than preprocessor defines, since the optional-feature
//! axis (LFN, write, dirs) is already handled by Cargo features.

/// Timeout budgets and SPI speed bounds. `Config::default()` matches the
/// reference implementation's compiled-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub init_timeout_ms: u32,
    pub read_timeout_ms: u32,
    pub write_timeout_ms: u32,
    pub erase_timeout_ms: u32,
    pub spi_init_hz: u32,
    pub spi_fast_hz: u32,
    pub spi_max_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            init_timeout_ms: 1000,
            read_timeout_ms: 200,
            write_timeout_ms: 500,
            erase_timeout_ms: 30_000,
            spi_init_hz: 400_000,
            spi_fast_hz: 4_000_000,
            spi_max_hz: 25_000_000,
        }
    }
}

impl Config {
    /// Clamps a requested fast-mode SPI speed to `spi_max_hz`.
    pub fn clamp_speed(&self, requested_hz: u32) -> u32 {
        requested_hz.min(self.spi_max_hz)
    }
}
