//! sftp-ingest SFTP adapter
//!
//! Implements the `IRemoteDirectoryClient` and `IRemoteSession` ports from
//! `ingest-core` on top of libssh2 (`ssh2` crate).
//!
//! ## Modules
//!
//! - [`client`] - Connector: TCP connect, SSH handshake, password auth
//! - [`session`] - Open session: directory listing, download, disconnect
//! - [`staging`] - Local file staging so partial downloads never land under the final name
//!
//! libssh2 is blocking; every call runs on `tokio::task::spawn_blocking`.

pub mod client;
pub mod session;
pub mod staging;

pub use client::SftpDirectoryClient;
pub use session::SftpSession;
