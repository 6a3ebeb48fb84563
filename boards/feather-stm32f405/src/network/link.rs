//! Ethernet link reported as mesh roles
//!
//! The W5500 board has no 802.15.4 radio, so the wired link stands in for
//! the mesh: the node counts as a child of the network while the link is
//! up and its mesh-local address is configured.

use core::net::Ipv6Addr;

use defmt::info;
use embassy_net::{ConfigV6, Ipv6Cidr, Stack, StaticConfigV6};
use hal_abstractions::{ChangedFlags, MeshNetwork, MeshRole};

use super::config::MESH_LOCAL_PREFIX_LEN;
use super::error::NetworkError;

pub struct EthLink {
    stack: Stack<'static>,
    address: Ipv6Addr,
    started: bool,
}

impl EthLink {
    pub fn new(stack: Stack<'static>, address: Ipv6Addr) -> Self {
        Self {
            stack,
            address,
            started: false,
        }
    }
}

impl MeshNetwork for EthLink {
    type Error = NetworkError;

    fn start(&mut self) -> Result<(), NetworkError> {
        self.stack.set_config_v6(ConfigV6::Static(StaticConfigV6 {
            address: Ipv6Cidr::new(self.address, MESH_LOCAL_PREFIX_LEN),
            gateway: None,
            dns_servers: Default::default(),
        }));
        self.started = true;
        info!(
            "Mesh-local address {}/{}",
            defmt::Display2Format(&self.address),
            MESH_LOCAL_PREFIX_LEN
        );
        Ok(())
    }

    fn role(&self) -> MeshRole {
        if !self.started {
            MeshRole::Disabled
        } else if self.stack.is_link_up() && self.stack.config_v6().is_some() {
            MeshRole::Child
        } else {
            MeshRole::Detached
        }
    }

    async fn wait_changed(&mut self) -> ChangedFlags {
        if self.stack.is_link_up() {
            self.stack.wait_link_down().await;
            info!("Ethernet link down");
        } else {
            self.stack.wait_link_up().await;
            info!("Ethernet link up");
        }
        ChangedFlags::THREAD_ROLE
    }
}
