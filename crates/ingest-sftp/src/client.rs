//! SftpDirectoryClient - IRemoteDirectoryClient implementation over SSH
//!
//! Each call to [`connect`](IRemoteDirectoryClient::connect) resolves the
//! server address, opens a TCP stream, performs the SSH handshake and
//! password authentication, and starts the SFTP subsystem. The result is a
//! fresh [`SftpSession`] owned by the caller's pass.

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use ssh2::Session;
use tracing::{debug, info, instrument};

use ingest_core::config::SftpConfig;
use ingest_core::domain::IngestError;
use ingest_core::ports::{IRemoteDirectoryClient, IRemoteSession};

use crate::session::{Connection, SftpSession};

/// Connector for a single SFTP server
#[derive(Debug, Clone)]
pub struct SftpDirectoryClient {
    settings: SftpConfig,
}

impl SftpDirectoryClient {
    /// Creates a connector for the server described by `settings`
    pub fn new(settings: SftpConfig) -> Self {
        Self { settings }
    }

    /// `host:port` label used in logs and error messages
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.settings.server_address, self.settings.port)
    }
}

#[async_trait::async_trait]
impl IRemoteDirectoryClient for SftpDirectoryClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint()))]
    async fn connect(&self) -> Result<Box<dyn IRemoteSession>, IngestError> {
        let settings = self.settings.clone();

        let connection = tokio::task::spawn_blocking(move || open_connection(&settings))
            .await
            .map_err(|e| IngestError::Connection(format!("SFTP connect task failed: {e}")))?
            .map_err(|e| IngestError::Connection(format!("{e:#}")))?;

        info!("SFTP session established");
        Ok(Box::new(SftpSession::new(connection, self.endpoint())))
    }
}

// ============================================================================
// Blocking connection setup
// ============================================================================

/// Opens an authenticated SFTP connection
///
/// The connect timeout bounds the TCP connect and then every individual
/// libssh2 call made on the session afterwards.
fn open_connection(settings: &SftpConfig) -> Result<Connection> {
    let endpoint = format!("{}:{}", settings.server_address, settings.port);
    let timeout = settings.connect_timeout();

    let addrs: Vec<SocketAddr> = (settings.server_address.as_str(), settings.port)
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve {endpoint}"))?
        .collect();

    let tcp = connect_any(&addrs, timeout).with_context(|| format!("Failed to connect to {endpoint}"))?;

    let mut session = Session::new().context("Failed to create SSH session")?;
    session.set_tcp_stream(tcp);
    session.set_timeout(timeout_millis(timeout));
    session
        .handshake()
        .with_context(|| format!("SSH handshake with {endpoint} failed"))?;

    session
        .userauth_password(&settings.username, &settings.password)
        .with_context(|| format!("Authentication as {} failed", settings.username))?;
    if !session.authenticated() {
        bail!("Server did not accept credentials for {}", settings.username);
    }

    let sftp = session
        .sftp()
        .context("Failed to start SFTP subsystem")?;

    debug!(endpoint = %endpoint, "SFTP subsystem started");
    Ok(Connection { session, sftp })
}

/// Tries each resolved address in turn, returning the first stream that connects
fn connect_any(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream> {
    let mut last_err = None;

    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(match last_err {
        Some(e) => anyhow!(e),
        None => anyhow!("address resolved to nothing"),
    })
}

/// libssh2 takes its timeout as milliseconds in a `u32`; 0 would mean "wait forever"
fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX).max(1)
}
