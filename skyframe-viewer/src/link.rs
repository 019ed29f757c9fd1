//! Payload link connection.
//!
//! Opens the byte stream the payload transmits on: the radio modem's
//! serial port in flight, or a TCP socket on the bench.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tracing::info;

use crate::config::{LinkConfig, LinkKind};

/// A readable payload link.
pub type LinkStream = Box<dyn AsyncRead + Unpin + Send>;

/// Human-readable description of where the link points.
pub fn describe(config: &LinkConfig) -> String {
    match config.kind {
        LinkKind::Serial => format!("serial:{}@{}", config.serial_port, config.baud_rate),
        LinkKind::Tcp => format!("tcp:{}", config.tcp_address),
    }
}

/// Open the link described by `config`.
pub async fn open(config: &LinkConfig) -> Result<LinkStream, Box<dyn std::error::Error>> {
    info!("opening payload link {}", describe(config));
    match config.kind {
        LinkKind::Serial => {
            let port = tokio_serial::new(&config.serial_port, config.baud_rate)
                .data_bits(tokio_serial::DataBits::Eight)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .flow_control(tokio_serial::FlowControl::None)
                .open_native_async()?;
            Ok(Box::new(port))
        }
        LinkKind::Tcp => {
            let addr: SocketAddr = config.tcp_address.parse()?;
            let timeout = Duration::from_millis(config.timeout_ms);
            let stream = tokio::time::timeout(timeout, TcpStream::connect(addr)).await??;
            stream.set_nodelay(true)?;
            info!("connected to payload at {addr}");
            Ok(Box::new(stream))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn describes_links() {
        let mut cfg = LinkConfig::default();
        cfg.serial_port = "/dev/ttyS1".into();
        assert_eq!(describe(&cfg), "serial:/dev/ttyS1@57600");

        cfg.kind = LinkKind::Tcp;
        cfg.tcp_address = "127.0.0.1:9".into();
        assert_eq!(describe(&cfg), "tcp:127.0.0.1:9");
    }

    #[tokio::test]
    async fn opens_tcp_link() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cfg = LinkConfig {
            kind: LinkKind::Tcp,
            tcp_address: listener.local_addr().unwrap().to_string(),
            ..LinkConfig::default()
        };

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream.write_all(b"hello").await.unwrap();
        });

        let mut link = open(&cfg).await.unwrap();
        let mut buf = [0u8; 5];
        link.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn bad_tcp_address_is_an_error() {
        let cfg = LinkConfig {
            kind: LinkKind::Tcp,
            tcp_address: "not an address".into(),
            ..LinkConfig::default()
        };
        assert!(open(&cfg).await.is_err());
    }
}
