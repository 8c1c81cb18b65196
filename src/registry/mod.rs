//! Peripheral registry
//!
//! Maps the name each peripheral announced in its handshake to the connection
//! it is currently reachable on.
//!
//! ```text
//!                         Arc<ClientRegistry>
//!                     ┌─────────────────────────┐
//!                     │ clients: HashMap<name,  │
//!                     │   Arc<PeripheralConn>   │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!   [Connection task]      [Connection task]       [OutboundSender]
//!   register/unregister    register/unregister     get(name) ──► write_line
//! ```
//!
//! Unregistering is conditional on identity: a connection that lost its name
//! to a reconnect cannot evict the newer entry on its way out.

pub mod entry;
pub mod store;

pub use entry::{PeripheralConnection, PeripheralWriter};
pub use store::ClientRegistry;
