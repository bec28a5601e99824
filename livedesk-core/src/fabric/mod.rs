// Fabric Client Adapter
//
// Two-tier layout:
//
// Tier 1: livedesk-fabric (pure HTTP bridge client)
//   - BridgeClient speaks the JSON envelope over HTTP
//   - Implements FabricClient defined here
//
// Tier 2: livedesk-core/service
//   - Orchestration only talks to `dyn FabricClient`

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FabricError, Result};
pub use traits::FabricClient;
pub use types::*;
