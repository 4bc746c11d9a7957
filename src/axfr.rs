// src/axfr.rs
//! Minimal AXFR client over TCP.
//!
//! Records are rendered one per line in presentation format. When the
//! closing SOA arrives a trailer line is appended:
//!
//! ```text
//! ;; XFR size: 42 records (messages 3, bytes 5120)
//! ```
//!
//! A stream that ends before the closing SOA is returned without the
//! trailer, which the caller treats as an incomplete transfer.

use crate::types::TransferError;
use log::debug;
use std::fmt::Write as _;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use trust_dns_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use trust_dns_proto::rr::{Name, RecordType};

pub const DNS_PORT: u16 = 53;

/// Marker the trailer line starts with once a transfer is complete.
pub const COMPLETION_MARKER: &str = "XFR size";

#[derive(Debug, Clone)]
pub struct AxfrClient {
    port: u16,
    max_records: usize,
}

impl Default for AxfrClient {
    fn default() -> Self {
        Self {
            port: DNS_PORT,
            max_records: 5_000_000,
        }
    }
}

impl AxfrClient {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub async fn transfer(
        &self,
        zone: &str,
        address: IpAddr,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransferError> {
        let server = SocketAddr::new(address, self.port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(server))
            .await
            .map_err(|_| TransferError::TimedOut(timeout))?
            .map_err(|e| TransferError::Connect(e.to_string()))?;
        let (mut reader, mut writer) = stream.into_split();

        let query = build_query(zone)?;
        let mut framed = Vec::with_capacity(query.len() + 2);
        framed.extend_from_slice(&(query.len() as u16).to_be_bytes());
        framed.extend_from_slice(&query);
        writer
            .write_all(&framed)
            .await
            .map_err(|e| TransferError::Connect(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransferError::Connect(e.to_string()))?;

        let mut rendered = String::new();
        let mut records = 0usize;
        let mut messages = 0usize;
        let mut bytes = 0usize;
        let mut soa_count = 0usize;

        loop {
            let mut len_bytes = [0u8; 2];
            match tokio::time::timeout(timeout, reader.read_exact(&mut len_bytes)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    debug!("{} @ {}: stream closed after {} records", zone, address, records);
                    break;
                }
                Ok(Err(e)) => return Err(TransferError::Connect(e.to_string())),
                Err(_) => return Err(TransferError::TimedOut(timeout)),
            }

            let msg_len = u16::from_be_bytes(len_bytes) as usize;
            let mut buffer = vec![0u8; msg_len];
            tokio::time::timeout(timeout, reader.read_exact(&mut buffer))
                .await
                .map_err(|_| TransferError::TimedOut(timeout))?
                .map_err(|e| TransferError::Connect(e.to_string()))?;

            let response = Message::from_vec(&buffer)
                .map_err(|e| TransferError::Protocol(e.to_string()))?;
            messages += 1;
            bytes += msg_len + 2;

            if response.response_code() != ResponseCode::NoError {
                return Err(TransferError::Refused(response.response_code().to_string()));
            }
            if response.answers().is_empty() {
                break;
            }

            for record in response.answers() {
                let _ = writeln!(rendered, "{}", record);
                records += 1;
                if record.record_type() == RecordType::SOA {
                    soa_count += 1;
                }
                if records > self.max_records {
                    return Err(TransferError::Protocol(format!(
                        "more than {} records",
                        self.max_records
                    )));
                }
            }

            if soa_count >= 2 {
                let _ = writeln!(
                    rendered,
                    ";; {}: {} records (messages {}, bytes {})",
                    COMPLETION_MARKER, records, messages, bytes
                );
                break;
            }
        }

        Ok(rendered.into_bytes())
    }
}

fn build_query(zone: &str) -> Result<Vec<u8>, TransferError> {
    let fqdn = format!("{}.", zone.trim_end_matches('.'));
    let name = Name::from_ascii(&fqdn).map_err(|e| TransferError::Protocol(e.to_string()))?;

    let mut message = Message::new();
    message.set_id(rand::random::<u16>());
    message.set_message_type(MessageType::Query);
    message.set_op_code(OpCode::Query);
    message.set_recursion_desired(false);
    message.add_query(Query::query(name, RecordType::AXFR));

    message
        .to_vec()
        .map_err(|e| TransferError::Protocol(e.to_string()))
}
