//! Transfer monitoring: per-request polling sessions over a Solana RPC node,
//! deduplicating persistence and listener notification.

pub mod notifier;
pub mod pipeline;
pub mod registry;
pub mod rpc;
pub mod session;

pub use notifier::{HttpNotifier, Notifier};
pub use pipeline::record_transfer;
pub use registry::{SessionRegistry, SessionTicket};
pub use rpc::{build_rpc_source, RpcTransferSource, TransferSource};
pub use session::{
    MonitorError, MonitorOutcome, MonitorServices, MonitorSession, MonitorSettings, SessionState,
};
