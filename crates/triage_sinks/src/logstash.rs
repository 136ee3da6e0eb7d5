//! Forwards LogEntry objects to a Logstash listener over TCP or UDP.
//! Mirrors `LogstashOutputEndpointModule`'s use of `python-logstash`'s
//! TCP/UDP handlers, reduced to a raw line-per-object write.

use std::io::Write;
use std::net::{TcpStream, UdpSocket};

use triage_protocol::{Kind, Object};
use triage_worker::Sink;

enum Transport {
    Tcp(TcpStream),
    Udp { socket: UdpSocket, target: String },
}

pub struct LogstashSink {
    transport: Transport,
}

impl LogstashSink {
    pub fn tcp(host: &str, port: u16) -> anyhow::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        Ok(LogstashSink {
            transport: Transport::Tcp(stream),
        })
    }

    pub fn udp(host: &str, port: u16) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(LogstashSink {
            transport: Transport::Udp {
                socket,
                target: format!("{host}:{port}"),
            },
        })
    }
}

impl Sink for LogstashSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::LogEntry)
    }

    fn handle(&mut self, input: &Object) {
        let line = format!("{input}\n");
        tracing::debug!(target: "triage_sinks", "logstash logging");
        let result = match &mut self.transport {
            Transport::Tcp(stream) => stream.write_all(line.as_bytes()).map_err(anyhow::Error::from),
            Transport::Udp { socket, target } => socket
                .send_to(line.as_bytes(), target)
                .map(|_| ())
                .map_err(anyhow::Error::from),
        };
        if let Err(e) = result {
            tracing::error!(target: "triage_sinks", error = %e, "logstash send failed");
        }
    }
}
