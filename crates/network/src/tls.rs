// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Module for wrapping raw TCP streams with TLS encryption.

use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use rustls::{
    ClientConfig, RootCertStore,
    pki_types::{CertificateDer, ServerName},
};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};

use crate::error::TransportError;

/// Installs the `ring` crypto provider as the process default, if none is installed yet.
pub fn install_cryptographic_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

fn webpki_root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    root_store
}

/// Creates a client TLS configuration trusting the bundled web PKI roots.
#[must_use]
pub fn create_tls_config() -> Arc<ClientConfig> {
    install_cryptographic_provider();

    let config = ClientConfig::builder()
        .with_root_certificates(webpki_root_store())
        .with_no_client_auth();
    Arc::new(config)
}

/// Creates a client TLS configuration trusting the web PKI roots plus every PEM certificate
/// found in `certs_dir`.
///
/// Files that do not contain certificates are skipped.
///
/// # Errors
///
/// Returns an error if `certs_dir` is not a readable directory.
pub fn create_tls_config_from_certs_dir(certs_dir: &Path) -> anyhow::Result<Arc<ClientConfig>> {
    install_cryptographic_provider();

    if !certs_dir.is_dir() {
        anyhow::bail!("Certificate path is not a directory: {certs_dir:?}");
    }

    let mut root_store = webpki_root_store();

    for entry in std::fs::read_dir(certs_dir)? {
        let path = entry?.path();
        let Ok(certs) = load_certs(&path) else {
            continue;
        };

        for cert in certs {
            if let Err(e) = root_store.add(cert) {
                tracing::warn!("Invalid certificate in {path:?}: {e}");
            }
        }
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .filter_map(std::result::Result::ok)
        .collect();
    Ok(certs)
}

/// Performs the TLS handshake for `domain` over an established TCP stream.
///
/// # Errors
///
/// Returns an error if `domain` is not a valid server name or the handshake fails.
pub async fn wrap_stream(
    socket: TcpStream,
    domain: &str,
    config: Option<Arc<ClientConfig>>,
) -> Result<TlsStream<TcpStream>, TransportError> {
    let config = config.unwrap_or_else(create_tls_config);

    // rustls expects IPv6 addresses without the surrounding [] brackets
    let domain = domain
        .strip_prefix('[')
        .and_then(|d| d.strip_suffix(']'))
        .unwrap_or(domain);
    let server_name = ServerName::try_from(domain.to_string())
        .map_err(|e| TransportError::Tls(format!("Invalid server name {domain:?}: {e}")))?;

    TlsConnector::from(config)
        .connect(server_name, socket)
        .await
        .map_err(|e| TransportError::Tls(e.to_string()))
}
