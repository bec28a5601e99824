// Livedesk Fabric Bridge Client
//
// Concrete FabricClient over an HTTP JSON bridge. The bridge takes
// `{id, method, params}` envelopes and answers `{id, result}` or
// `{id, error}`; it fronts the media fabric's client library.
//
// Architecture:
// - livedesk-core/fabric: the FabricClient trait and its request/response types
// - livedesk-fabric: this transport, with its own error type

pub mod client;
pub mod error;

pub use client::BridgeClient;
pub use error::BridgeError;
