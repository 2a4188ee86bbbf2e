//! Scripted stand-ins for ssh, the network and the terminal.
//!
//! These drive [`LoginSession`](crate::session::LoginSession) and
//! [`CommandRunner`](crate::runner::CommandRunner) in tests without real
//! processes:
//!
//! - [`MockTransport`]: a pty whose remote side answers scripted triggers
//! - [`MockSpawner`]: hands out prepared transports and records commands
//! - [`MockProber`]: reachability from a fixed list
//! - [`RecordingResizer`]: remembers every window size applied to it

mod harness;
mod transport;

pub use harness::{MockProber, MockSpawner, RecordingResizer};
pub use transport::MockTransport;
