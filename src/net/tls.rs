//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::net::listener::ListenerError;

/// Load TLS configuration from certificate and key files.
///
/// Missing or unreadable material is a listener fault: the service refuses
/// to start rather than run without the HTTPS listener it was asked for.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, ListenerError> {
    install_crypto_provider();

    for path in [cert_path, key_path] {
        if !path.exists() {
            return Err(ListenerError::Tls(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("TLS material not found: {:?}", path),
            )));
        }
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(ListenerError::Tls)?;

    tracing::info!(cert = ?cert_path, key = ?key_path, "TLS material loaded");
    Ok(config)
}

/// Pin aws-lc-rs as the process crypto provider. A provider installed
/// earlier (by a test harness, say) is left in place.
fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
