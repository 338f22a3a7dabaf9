mod adapter;
mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use adapter::{AdapterError, HttpAdapter, RequestCallbacks, NETWORK_ERROR_MESSAGE};
pub use reqwest::Method;
pub use transport::{
  OutboundRequest, RawResponse, RequestBody, ReqwestTransport, Transport, TransportError,
};
