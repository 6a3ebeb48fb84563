//! Periodic request loop

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::UdpTransport;

use crate::action::NodeAction;
use crate::coap::CoapClient;
use crate::config::{NodeConfig, SensorFailurePolicy};
use crate::connection::ConnectionMonitor;

/// Result of a single worker cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// The action ran to completion
    Completed,
    /// The action failed; the next cycle retries
    Failed,
    /// No further requests will be issued
    Halted,
}

/// Runs one action per interval while the node is attached
pub struct Worker<'m, A, T, D> {
    monitor: &'m ConnectionMonitor,
    client: CoapClient<T, D>,
    action: A,
    interval_ms: u32,
    sensor_failure: SensorFailurePolicy,
    halted: bool,
    cycles: u32,
}

impl<'m, A, T, D> Worker<'m, A, T, D>
where
    A: NodeAction,
    T: UdpTransport,
    D: DelayNs,
{
    pub fn new(
        monitor: &'m ConnectionMonitor,
        client: CoapClient<T, D>,
        action: A,
        config: &NodeConfig,
    ) -> Self {
        Self {
            monitor,
            client,
            action,
            interval_ms: config.interval_ms,
            sensor_failure: config.sensor_failure,
            halted: false,
            cycles: 0,
        }
    }

    /// Wait for the mesh, perform the action once and sleep the interval
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.halted {
            return CycleOutcome::Halted;
        }

        if !self.monitor.is_connected() {
            warn!("Not connected");
            self.monitor.wait_connected().await;
        }

        let outcome = match self.action.perform(&mut self.client).await {
            Ok(()) => CycleOutcome::Completed,
            Err(e) if e.is_sensor_failure() && self.sensor_failure == SensorFailurePolicy::Halt => {
                error!("Sensor failure, no further requests: {:?}", e);
                self.halted = true;
                return CycleOutcome::Halted;
            }
            Err(_) => CycleOutcome::Failed,
        };
        self.cycles = self.cycles.wrapping_add(1);

        self.client.delay_mut().delay_ms(self.interval_ms).await;
        outcome
    }

    /// Cycle until halted
    pub async fn run(&mut self) {
        info!("Worker started, interval {} ms", self.interval_ms);
        while self.run_cycle().await != CycleOutcome::Halted {}
        warn!("Worker halted after {} cycles", self.cycles);
    }

    /// Completed plus failed cycles
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn client(&self) -> &CoapClient<T, D> {
        &self.client
    }
}
