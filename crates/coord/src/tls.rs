// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! TLS configuration for the coordinator transport.

use std::path::PathBuf;
use tonic::transport::{Certificate, ClientTlsConfig, Identity};

/// Mutual-TLS material for client connections.
///
/// `skip_verify` drops CA pinning and falls back to the transport's default
/// trust roots; it never disables certificate validation entirely.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    /// Expected server name when it differs from the endpoint host.
    pub server_name: Option<String>,
    pub skip_verify: bool,
}

impl TlsConfig {
    pub fn is_empty(&self) -> bool {
        self.ca_file.is_none() && self.cert_file.is_none() && self.key_file.is_none()
    }

    /// Build the tonic client TLS config, reading key material from disk.
    pub fn client_config(&self) -> std::io::Result<ClientTlsConfig> {
        let mut tls = ClientTlsConfig::new().with_native_roots();
        if !self.skip_verify {
            if let Some(ca) = &self.ca_file {
                tls = tls.ca_certificate(Certificate::from_pem(std::fs::read(ca)?));
            }
        }
        if let (Some(cert), Some(key)) = (&self.cert_file, &self.key_file) {
            tls = tls.identity(Identity::from_pem(std::fs::read(cert)?, std::fs::read(key)?));
        }
        if let Some(name) = &self.server_name {
            tls = tls.domain_name(name.clone());
        }
        Ok(tls)
    }
}
