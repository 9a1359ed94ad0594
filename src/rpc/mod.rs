pub mod resilient_client;
pub mod transport;

pub use resilient_client::ResilientRpcClient;
pub use transport::{ConfirmationLevel, RpcTransport, SignatureStatusView, SimulationReport, TransportError};
