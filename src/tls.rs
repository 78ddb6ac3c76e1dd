// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Client TLS Material
//!
//! Loads the PKCS#12 client identity presented for mutual TLS (and used by
//! the broker for EXTERNAL authentication) together with an optional PEM
//! chain of additional trusted certificates.

use crate::{configs::TlsConfigs, errors::AmqpError};
use lapin::tcp::{OwnedIdentity, OwnedTLSConfig};
use std::{fs, path::Path};
use tracing::{debug, error};

/// Reads the certificate material referenced by `cfg`.
///
/// # Parameters
/// * `cfg` - Paths of the PKCS#12 identity and the optional PEM CA chain, and
///   the identity passphrase
///
/// # Returns
/// The TLS configuration handed to lapin, or `TlsMaterialError` naming the
/// unreadable file
pub fn load_tls_config(cfg: &TlsConfigs) -> Result<OwnedTLSConfig, AmqpError> {
    debug!(path = %cfg.identity_path.display(), "loading client identity");
    let der = read(&cfg.identity_path, |p| fs::read(p))?;
    if der.is_empty() {
        error!(path = %cfg.identity_path.display(), "client identity is empty");
        return Err(AmqpError::TlsMaterialError(
            cfg.identity_path.display().to_string(),
        ));
    }

    let cert_chain = match &cfg.ca_cert_path {
        Some(path) => {
            debug!(path = %path.display(), "loading trusted ca chain");
            Some(read(path, |p| fs::read_to_string(p))?)
        }
        None => None,
    };

    Ok(OwnedTLSConfig {
        identity: Some(OwnedIdentity {
            der,
            password: cfg.identity_password.clone(),
        }),
        cert_chain,
    })
}

fn read<T>(path: &Path, f: impl Fn(&Path) -> std::io::Result<T>) -> Result<T, AmqpError> {
    f(path).map_err(|err| {
        error!(
            error = err.to_string(),
            path = %path.display(),
            "failure to read tls material"
        );
        AmqpError::TlsMaterialError(path.display().to_string())
    })
}
