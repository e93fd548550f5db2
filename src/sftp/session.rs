use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::SftpError;
use crate::sftp::SftpSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve and connect with timeouts.
fn create_tcp_connection(addr: &str) -> Result<TcpStream, SftpError> {
    let connect_err = |e: std::io::Error| SftpError::Connect {
        addr: addr.to_string(),
        message: e.to_string(),
    };
    let mut addrs = addr.to_socket_addrs().map_err(|_| SftpError::NoAddress(addr.to_string()))?;
    let sock = addrs.next().ok_or_else(|| SftpError::NoAddress(addr.to_string()))?;
    let tcp = TcpStream::connect_timeout(&sock, CONNECT_TIMEOUT).map_err(connect_err)?;
    let _ = tcp.set_read_timeout(Some(IO_TIMEOUT));
    let _ = tcp.set_write_timeout(Some(IO_TIMEOUT));
    Ok(tcp)
}

/// Opens an authenticated SSH session using the configured private key.
/// Host keys are not verified.
pub fn connect_session(settings: &SftpSettings) -> Result<ssh2::Session, SftpError> {
    if !settings.private_key_path.exists() {
        return Err(SftpError::KeyNotFound(settings.private_key_path.clone()));
    }
    let addr = settings.addr();
    let tcp = create_tcp_connection(&addr)?;
    let mut sess =
        ssh2::Session::new().map_err(|_| SftpError::SessionCreateFailed(addr.clone()))?;
    sess.set_tcp_stream(tcp);
    sess.handshake().map_err(|_| SftpError::HandshakeFailed(addr.clone()))?;

    if let Err(e) =
        sess.userauth_pubkey_file(&settings.username, None, &settings.private_key_path, None)
    {
        tracing::debug!("public key authentication failed: {}", e);
    }
    if sess.authenticated() {
        Ok(sess)
    } else {
        Err(SftpError::AuthFailed { addr, username: settings.username.clone() })
    }
}
