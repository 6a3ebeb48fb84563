//! USB CDC-ACM console port

use defmt::{info, Format};
use embassy_stm32::peripherals::USB_OTG_FS;
use embassy_stm32::usb::Driver;
use embassy_usb::class::cdc_acm::CdcAcmClass;
use hal_abstractions::LineControl;

pub type UsbDriver = Driver<'static, USB_OTG_FS>;

/// Line-control request the CDC-ACM class cannot honour
#[derive(Debug, Clone, Copy, Format)]
pub struct Unsupported;

/// Modem-control view of the CDC-ACM port
///
/// The class only exposes the host-driven lines, so DCD and DSR writes
/// report [`Unsupported`].
pub struct UsbSerialLine<'a> {
    class: CdcAcmClass<'a, Driver<'a, USB_OTG_FS>>,
}

impl<'a> UsbSerialLine<'a> {
    pub fn new(class: CdcAcmClass<'a, Driver<'a, USB_OTG_FS>>) -> Self {
        Self { class }
    }

    /// Write a banner once the host has opened the port
    pub async fn greet(&mut self) {
        self.class.wait_connection().await;
        if self.class.write_packet(b"coap node ready\r\n").await.is_err() {
            info!("USB host went away before greeting");
        }
    }
}

impl LineControl for UsbSerialLine<'_> {
    type Error = Unsupported;

    fn data_terminal_ready(&mut self) -> Result<bool, Unsupported> {
        Ok(self.class.dtr())
    }

    fn set_carrier_detect(&mut self, _on: bool) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    fn set_data_set_ready(&mut self, _on: bool) -> Result<(), Unsupported> {
        Err(Unsupported)
    }
}
