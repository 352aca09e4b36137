//! Session-side collaborators of the fdtable server.
//!
//! The table server never talks to a socket. It asks a
//! [`SessionGateway`] who is behind a session and hands it pushes to
//! deliver, and it records which node owns a seated player through a
//! [`BindingStore`]. Both are traits so the clustering runtime can plug
//! in its own implementation.
//!
//! ```text
//! Match / Table (above)  ← resolve uid, push results, bind/unbind seats
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Transport / cluster runtime (below, not part of this workspace)
//! ```
//!
//! [`LocalGateway`] and [`MemoryBindingStore`] are in-process
//! implementations for single-node deployments, tests, and the demo.

mod binding;
mod error;
mod gateway;

pub use binding::{BindingStore, MemoryBindingStore};
pub use error::{BindingError, GatewayError};
pub use gateway::{LocalGateway, PushReceiver, SessionGateway};
