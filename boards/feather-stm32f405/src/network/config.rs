//! Network configuration structures

use core::net::Ipv6Addr;

/// Mesh-local prefix shared with the default CoAP peer
pub const MESH_LOCAL_PREFIX: [u16; 4] = [0xfd4d, 0xeafc, 0x6f32, 0xc7cf];

/// Prefix length of the mesh-local network
pub const MESH_LOCAL_PREFIX_LEN: u8 = 64;

/// Local port the CoAP socket binds to
pub const COAP_LOCAL_PORT: u16 = 5683;

/// Network stack configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// MAC address for Ethernet
    pub mac_addr: [u8; 6],
    /// Random seed for network stack
    pub seed: u64,
}

impl NetworkConfig {
    /// Mesh-local address with an EUI-64 interface id built from the MAC
    pub fn mesh_local_address(&self) -> Ipv6Addr {
        let [p0, p1, p2, p3] = MESH_LOCAL_PREFIX;
        let m = self.mac_addr;
        // Flip the universal/local bit and insert ff:fe in the middle
        let iid = [
            u16::from_be_bytes([m[0] ^ 0x02, m[1]]),
            u16::from_be_bytes([m[2], 0xff]),
            u16::from_be_bytes([0xfe, m[3]]),
            u16::from_be_bytes([m[4], m[5]]),
        ];
        Ipv6Addr::new(p0, p1, p2, p3, iid[0], iid[1], iid[2], iid[3])
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mac_addr: [0x02, 0x00, 0x00, 0x12, 0x34, 0x56],
            seed: 0x1234_5678_u64,
        }
    }
}
