//! Ports: the inbound `Repo` API and the outbound network SPI.

pub mod inbound;
pub mod outbound;
