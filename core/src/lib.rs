//! Platform-agnostic CoAP node logic
//!
//! This crate contains the behaviour shared by every board: connection
//! tracking from mesh role changes, the CoAP client, the sensor payload
//! and the periodic worker. It has NO hardware dependencies; boards plug
//! in through the traits in `hal-abstractions`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

// Must come first so the logging macros are visible to every module
mod fmt;

pub mod action;
pub mod coap;
pub mod config;
pub mod connection;
pub mod error;
pub mod host;
pub mod payload;
pub mod worker;

#[cfg(test)]
mod mock;

pub use action::{NodeAction, ResourcePoll, SensorReport};
pub use coap::{CoapClient, Method, Request, Response, ResponseCode};
pub use config::{NodeConfig, SensorFailurePolicy};
pub use connection::{watch, ConnectionMonitor};
pub use error::NodeError;
pub use payload::SensorPayload;
pub use worker::{CycleOutcome, Worker};
