//! sftp-ingest core - domain types and capability ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RemotePath`, `ModifiedTime`, `RemoteFileEntry`, `IngestedFileRecord`
//! - **Error taxonomy** - `IngestError` classifies failures by the scope they abort
//! - **Port definitions** - `IRemoteDirectoryClient`, `IRemoteSession`, `IRecordStore`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module has no I/O. Ports are traits implemented by the adapter
//! crates (`ingest-sftp`, `ingest-cache`); `ingest-sync` drives them.

pub mod config;
pub mod domain;
pub mod ports;
