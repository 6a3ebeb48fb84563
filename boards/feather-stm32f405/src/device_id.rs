//! Device identifier utilities for STM32F405
//!
//! The factory-programmed 96-bit unique device ID is stable across
//! reboots and unique to each chip. The node derives its MAC address, and
//! through EUI-64 its mesh-local IPv6 address, from it.

/// Get the STM32F405 unique device ID as a hex string
pub fn uid_hex() -> &'static str {
    embassy_stm32::uid::uid_hex()
}

/// Get the raw 12-byte (96-bit) unique device ID
pub fn uid() -> &'static [u8; 12] {
    embassy_stm32::uid::uid()
}

/// MAC address of this device
pub fn mac_address() -> [u8; 6] {
    mac_from_uid(uid())
}

/// Fold the UID into a locally administered unicast MAC
pub fn mac_from_uid(uid: &[u8; 12]) -> [u8; 6] {
    let mut mac = [0u8; 6];
    for (i, byte) in mac.iter_mut().enumerate() {
        *byte = uid[i] ^ uid[i + 6];
    }
    mac[0] = (mac[0] | 0x02) & !0x01;
    mac
}
