//! A TCP stream that can be upgraded to TLS mid-session.

use std::{
    fmt::{self, Debug, Formatter},
    io::{self, Read, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{HandshakeError, Protocol, TlsConnector, TlsStream};

use crate::transport::smtp::error::{self, Error};

/// Accepted protocols by default.
/// This removes TLS 1.0 and 1.1 compared to native-tls defaults.
const DEFAULT_TLS_MIN_PROTOCOL: Protocol = Protocol::Tlsv12;

/// Parameters to use for a TLS connection.
#[derive(Clone)]
pub struct TlsParameters {
    connector: TlsConnector,
    /// The domain name which is expected in the TLS certificate from the server
    domain: String,
}

impl TlsParameters {
    /// Creates default TLS parameters for the given server domain.
    pub fn new(domain: String) -> Result<Self, Error> {
        let connector = TlsConnector::builder()
            .min_protocol_version(Some(DEFAULT_TLS_MIN_PROTOCOL))
            .build()
            .map_err(error::tls)?;
        Ok(Self { connector, domain })
    }

    /// The domain the server certificate is validated against.
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Debug for TlsParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParameters")
            .field("domain", &self.domain)
            .finish()
    }
}

/// Represents the different types of underlying network streams
pub enum NetworkStream {
    /// Plain TCP stream
    Tcp(TcpStream),
    /// Encrypted TCP stream
    Tls(Box<TlsStream<TcpStream>>),
}

impl Debug for NetworkStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetworkStream::Tcp(_) => "NetworkStream::Tcp",
            NetworkStream::Tls(_) => "NetworkStream::Tls",
        })
    }
}

impl NetworkStream {
    /// Connects over plain TCP, trying each resolved address in turn.
    pub fn connect<A: ToSocketAddrs>(
        server: A,
        timeout: Option<Duration>,
    ) -> Result<NetworkStream, Error> {
        fn try_connect(addr: &SocketAddr, timeout: Option<Duration>) -> io::Result<TcpStream> {
            match timeout {
                Some(timeout) => TcpStream::connect_timeout(addr, timeout),
                None => TcpStream::connect(addr),
            }
        }

        let mut last_err = None;
        for addr in server.to_socket_addrs().map_err(error::connection)? {
            match try_connect(&addr, timeout) {
                Ok(stream) => return Ok(NetworkStream::Tcp(stream)),
                Err(err) => last_err = Some(err),
            }
        }

        Err(match last_err {
            Some(err) => error::connection(err),
            None => error::connection("could not resolve to any address"),
        })
    }

    /// Upgrades to a TLS connection
    pub fn upgrade_tls(&mut self, tls_parameters: &TlsParameters) -> Result<(), Error> {
        match self {
            NetworkStream::Tcp(stream) => {
                let tcp_stream = stream.try_clone().map_err(error::network)?;
                let tls_stream = tls_parameters
                    .connector
                    .connect(&tls_parameters.domain, tcp_stream)
                    .map_err(|err| match err {
                        HandshakeError::Failure(err) => error::tls(err),
                        HandshakeError::WouldBlock(_) => {
                            error::tls("TLS handshake interrupted")
                        }
                    })?;
                *self = NetworkStream::Tls(Box::new(tls_stream));
                Ok(())
            }
            NetworkStream::Tls(_) => Ok(()),
        }
    }

    /// Is the stream encrypted
    pub fn is_encrypted(&self) -> bool {
        match self {
            NetworkStream::Tcp(_) => false,
            NetworkStream::Tls(_) => true,
        }
    }

    /// Shuts down the underlying TCP socket.
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        self.tcp_ref().shutdown(how)
    }

    /// Set read timeout for IO calls
    pub fn set_read_timeout(&self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_ref().set_read_timeout(duration)
    }

    /// Set write timeout for IO calls
    pub fn set_write_timeout(&self, duration: Option<Duration>) -> io::Result<()> {
        self.tcp_ref().set_write_timeout(duration)
    }

    fn tcp_ref(&self) -> &TcpStream {
        match self {
            NetworkStream::Tcp(stream) => stream,
            NetworkStream::Tls(stream) => stream.get_ref(),
        }
    }
}

impl Read for NetworkStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(stream) => stream.read(buf),
            NetworkStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for NetworkStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetworkStream::Tcp(stream) => stream.write(buf),
            NetworkStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetworkStream::Tcp(stream) => stream.flush(),
            NetworkStream::Tls(stream) => stream.flush(),
        }
    }
}
