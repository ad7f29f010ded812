use alloc::format;
#[cfg(feature = "mtls")]
use alloc::vec::Vec;
use core::marker::PhantomData;
use embassy_net::tcp::ConnectError;
use embassy_net::{
    dns::{DnsQueryType, Error as DNSError},
    tcp::TcpSocket,
    Stack,
};
use embassy_time::Duration;
use embedded_io_async::{ErrorType, Read, ReadExactError, Write};
#[cfg(feature = "tls")]
use embedded_tls::{Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext, UnsecureProvider};
#[cfg(feature = "mtls")]
use p256::elliptic_curve::SecretKey;
use rand_core::{CryptoRng, RngCore};

use crate::config::CONFIG;
use crate::pem;

const MAX_RETRIES: usize = 3;
const SOCKET_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum Error {
    CACertificateMissing,
    ClientCertificateMissing,
    ClientPrivateKeyMissing,
    #[allow(dead_code)]
    DNSQueryFailed(DNSError),
    DNSLookupFailed,
    #[allow(dead_code)]
    SocketConnectionError(ConnectError),
    #[allow(dead_code)]
    TLSHandshakeFailed,
    #[allow(dead_code)]
    PEMParseError(pem::Error),
}

/// Wraps the broker connection (plain TCP or a TLS session) behind a single
/// Read + Write surface with bounded retries.
pub struct Transport<'a, S>
where
    S: Read + Write + 'a,
{
    pub session: S,
    _marker: PhantomData<&'a ()>,
}

async fn connect_socket<'a>(
    stack: Stack<'static>,
    rx_buffer: &'a mut [u8],
    tx_buffer: &'a mut [u8],
    hostname: &str,
    port: u16,
) -> Result<TcpSocket<'a>, Error> {
    let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));

    let addr = stack
        .dns_query(hostname, DnsQueryType::A)
        .await
        .map_err(Error::DNSQueryFailed)?
        .first()
        .copied()
        .ok_or(Error::DNSLookupFailed)?;

    log::info!("Connecting TCP socket to {}:{}", hostname, port);
    socket
        .connect((addr, port))
        .await
        .map_err(Error::SocketConnectionError)?;
    log::info!("TCP connected");

    Ok(socket)
}

#[cfg(feature = "tls")]
impl<'a> Transport<'a, TlsConnection<'a, TcpSocket<'a>, Aes128GcmSha256>> {
    pub async fn new<RNG>(
        stack: Stack<'static>,
        rng: &mut RNG,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        tls_read_buffer: &'a mut [u8],
        tls_write_buffer: &'a mut [u8],
        hostname: &str,
        port: u16,
    ) -> Result<Self, Error>
    where
        RNG: CryptoRng + RngCore,
    {
        let socket = connect_socket(stack, rx_buffer, tx_buffer, hostname, port).await?;

        let ca_chain = CONFIG.tls_ca.ok_or(Error::CACertificateMissing)?;
        let ca_der = pem::decode(ca_chain).map_err(Error::PEMParseError)?;

        #[cfg(feature = "mtls")]
        let (client_cert_der, client_key_der): (Vec<u8>, Vec<u8>);

        let mut config = TlsConfig::new().with_server_name(hostname);
        config = config.with_ca(embedded_tls::Certificate::X509(&ca_der));
        log::debug!("CA certificate loaded: {} bytes", ca_der.len());

        #[cfg(feature = "mtls")]
        {
            let tls_cert = CONFIG.tls_cert.ok_or(Error::ClientCertificateMissing)?;
            let tls_key = CONFIG.tls_key.ok_or(Error::ClientPrivateKeyMissing)?;

            client_cert_der = pem::decode(tls_cert).map_err(Error::PEMParseError)?;
            client_key_der = pem::decode(tls_key).map_err(Error::PEMParseError)?;

            // Surface an unusable device key before the handshake does
            if let Err(e) = SecretKey::<p256::NistP256>::from_sec1_der(&client_key_der) {
                log::error!("Device private key is not valid SEC1 DER: {:?}", e);
            }

            config = config.with_cert(embedded_tls::Certificate::X509(&client_cert_der));
            config = config.with_priv_key(&client_key_der);

            log::debug!(
                "mTLS enabled: cert {} bytes, key {} bytes",
                client_cert_der.len(),
                client_key_der.len()
            );
        }

        let mut tls: TlsConnection<TcpSocket, Aes128GcmSha256> =
            TlsConnection::new(socket, tls_read_buffer, tls_write_buffer);

        log::info!("Starting TLS handshake with {}", hostname);
        let crypto_provider = UnsecureProvider::new::<Aes128GcmSha256>(rng);
        tls.open(TlsContext::new(&config, crypto_provider))
            .await
            .map_err(|e| {
                log::error!("TLS handshake failed: {:?}", e);
                Error::TLSHandshakeFailed
            })?;
        log::info!("TLS handshake complete");

        Ok(Self {
            session: tls,
            _marker: PhantomData,
        })
    }
}

#[cfg(not(feature = "tls"))]
impl<'a> Transport<'a, TcpSocket<'a>> {
    pub async fn new<RNG>(
        stack: Stack<'static>,
        _rng: &mut RNG,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        _tls_read_buffer: &'a mut [u8],
        _tls_write_buffer: &'a mut [u8],
        hostname: &str,
        port: u16,
    ) -> Result<Self, Error>
    where
        RNG: CryptoRng + RngCore,
    {
        let socket = connect_socket(stack, rx_buffer, tx_buffer, hostname, port).await?;

        Ok(Self {
            session: socket,
            _marker: PhantomData,
        })
    }
}

impl<'a, S> ErrorType for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
{
    type Error = S::Error;
}

impl<'a, S> Read for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
    S::Error: core::fmt::Debug,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, S::Error> {
        for attempt in 0..MAX_RETRIES {
            match self.session.read(buf).await {
                Ok(n) => return Ok(n),
                Err(e) => {
                    if is_eof_error(&e) {
                        log::debug!("EOF encountered, not retrying: {:?}", e);
                        return Err(e);
                    }

                    log::warn!("read attempt {} failed: {:?}", attempt + 1, e);
                    if attempt + 1 == MAX_RETRIES {
                        return Err(e);
                    }
                }
            }
        }
        unreachable!()
    }

    async fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<(), ReadExactError<S::Error>> {
        while !buf.is_empty() {
            let mut retry = 0;
            loop {
                match self.session.read(buf).await {
                    Ok(0) => return Err(ReadExactError::UnexpectedEof),
                    Ok(n) => {
                        buf = &mut buf[n..];
                        break;
                    }
                    Err(e) => {
                        if is_eof_error(&e) {
                            log::debug!("EOF encountered in read_exact: {:?}", e);
                            return Err(ReadExactError::UnexpectedEof);
                        }

                        retry += 1;
                        log::warn!("read_exact attempt {} failed: {:?}", retry, e);
                        if retry >= MAX_RETRIES {
                            return Err(ReadExactError::Other(e));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

// The session error types don't expose a structured EOF variant, so match on
// the debug representation.
fn is_eof_error<E: core::fmt::Debug>(error: &E) -> bool {
    let error_str = format!("{:?}", error);
    error_str.contains("Eof")
        || error_str.contains("UnexpectedEof")
        || error_str.contains("ConnectionClosed")
        || error_str.contains("BrokenPipe")
}

impl<'a, S> Write for Transport<'a, S>
where
    S: ErrorType + Read + Write + 'a,
    S::Error: core::fmt::Debug,
{
    async fn write(&mut self, buf: &[u8]) -> Result<usize, S::Error> {
        for attempt in 0..MAX_RETRIES {
            match self.session.write(buf).await {
                Ok(n) => {
                    // Flush after every write: the MQTT client never calls
                    // flush() and the TLS session buffers records until it is
                    // called, so packets would otherwise never hit the wire.
                    if let Err(e) = self.session.flush().await {
                        log::error!("flush after write failed: {:?}", e);
                        return Err(e);
                    }
                    return Ok(n);
                }
                Err(e) => {
                    log::warn!("write attempt {} failed: {:?}", attempt + 1, e);
                    if attempt + 1 == MAX_RETRIES {
                        return Err(e);
                    }
                }
            }
        }
        unreachable!()
    }

    async fn flush(&mut self) -> Result<(), S::Error> {
        for attempt in 0..MAX_RETRIES {
            match self.session.flush().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!("flush attempt {} failed: {:?}", attempt + 1, e);
                    if attempt + 1 == MAX_RETRIES {
                        return Err(e);
                    }
                }
            }
        }
        unreachable!()
    }

    // write_all comes from the provided trait impl, which loops over the
    // retrying write() above.
}
