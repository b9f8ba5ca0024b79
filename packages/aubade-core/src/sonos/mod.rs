//! Sonos speaker control over UPnP/SOAP.
//!
//! The free functions in the submodules do the actual protocol work; the
//! [`SonosConnectorImpl`] wrapper packages them behind the trait seams the
//! orchestration services consume.

pub mod client;
pub mod didl;
pub mod grouping;
pub mod music_services;
pub mod queue;
pub mod services;
pub mod soap;
pub mod traits;
pub mod transport;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::SonosConnectorImpl;
pub use services::SonosService;
pub use traits::{SonosConnector, SonosContent, SonosGrouping, SonosTransport};
pub use transport::{ClientError, ClientResult};
pub use types::{QueueItem, QueuePage, TrackInfo, TrackProgress};
