//! Serial host handshake
//!
//! Console output is useless until a terminal opens the port, so the
//! firmware holds off until the host raises DTR and then signals its own
//! readiness through DCD and DSR.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::LineControl;

/// DTR polling period
pub const DTR_POLL_INTERVAL_MS: u32 = 100;

/// Wait until the host asserts DTR, then raise DCD and DSR
pub async fn wait_for_host<L, D>(line: &mut L, delay: &mut D)
where
    L: LineControl,
    D: DelayNs,
{
    info!("Waiting for host to be ready to communicate");

    loop {
        match line.data_terminal_ready() {
            Ok(true) => break,
            Ok(false) => {}
            Err(_) => warn!("Failed to read DTR"),
        }
        delay.delay_ms(DTR_POLL_INTERVAL_MS).await;
    }

    if line.set_carrier_detect(true).is_err() {
        debug!("Failed to set DCD");
    }
    if line.set_data_set_ready(true).is_err() {
        debug!("Failed to set DSR");
    }
    info!("Host ready");
}
