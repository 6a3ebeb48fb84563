//! Serial line control for the host handshake

/// Modem-control lines of a (virtual) serial port
pub trait LineControl {
    type Error: core::fmt::Debug;

    /// Data Terminal Ready as asserted by the host
    fn data_terminal_ready(&mut self) -> Result<bool, Self::Error>;

    /// Drive Data Carrier Detect towards the host
    fn set_carrier_detect(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Drive Data Set Ready towards the host
    fn set_data_set_ready(&mut self, on: bool) -> Result<(), Self::Error>;
}
