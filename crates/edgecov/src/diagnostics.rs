//! Diagnostic sink for network replay events.
//!
//! Transfer and packet events are printed for inspection only; they never
//! reach the edge log. The sink is swappable so diagnostics can be sent to
//! the tracing subscriber, to a plain text stream, or nowhere.

use std::fmt;
use std::io::Write;

use tracing::info;

/// Packet direction relative to the guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Received by the guest.
    Incoming,
    /// Sent by the guest.
    Outgoing,
}

impl Direction {
    /// Raw direction code used by the replay host (0 = in, 1 = out).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Incoming => 0,
            Self::Outgoing => 1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoming => write!(f, "in"),
            Self::Outgoing => write!(f, "out"),
        }
    }
}

/// A DMA-style transfer between guest buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetTransfer {
    /// Transfer type code reported by the device model.
    pub kind: u32,
    pub src_addr: u64,
    pub dst_addr: u64,
    pub num_bytes: usize,
}

/// A packet handled by the network device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub direction: Direction,
    /// Guest buffer address the packet was copied from.
    pub old_buf_addr: u64,
    pub bytes: Vec<u8>,
}

/// Fire-and-forget receiver for diagnostic events.
pub trait DiagnosticSink {
    fn net_transfer(&mut self, transfer: &NetTransfer);
    fn packet(&mut self, packet: &Packet);
}

/// Emits diagnostics as `tracing` events.
#[derive(Debug, Default)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn net_transfer(&mut self, transfer: &NetTransfer) {
        info!(
            kind = transfer.kind,
            src = format!("{:#x}", transfer.src_addr),
            dst = format!("{:#x}", transfer.dst_addr),
            bytes = transfer.num_bytes,
            "net transfer"
        );
    }

    fn packet(&mut self, packet: &Packet) {
        info!(
            direction = %packet.direction,
            old_buf_addr = format!("{:#x}", packet.old_buf_addr),
            size = packet.bytes.len(),
            content = %printable(&packet.bytes),
            "handle packet"
        );
    }
}

/// Writes diagnostics as text lines to any writer (stdout by default).
pub struct ConsoleDiagnostics<W: Write> {
    out: W,
}

impl ConsoleDiagnostics<std::io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> ConsoleDiagnostics<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DiagnosticSink for ConsoleDiagnostics<W> {
    // Write errors are ignored: diagnostics must never stop a recording.
    fn net_transfer(&mut self, transfer: &NetTransfer) {
        let _ = writeln!(
            self.out,
            "net transfer: src: {:#x}, dst: {:#x}, n: {}",
            transfer.src_addr, transfer.dst_addr, transfer.num_bytes
        );
    }

    fn packet(&mut self, packet: &Packet) {
        let _ = writeln!(
            self.out,
            "handle packet: size: {}, direction: {}, old_buf_addr: {:#x}",
            packet.bytes.len(),
            packet.direction.code(),
            packet.old_buf_addr
        );
        let _ = writeln!(self.out, "content: {}", printable(&packet.bytes));
    }
}

/// Discards all diagnostics.
#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn net_transfer(&mut self, _transfer: &NetTransfer) {}
    fn packet(&mut self, _packet: &Packet) {}
}

/// Printable ASCII as-is, everything else as `\xNN`.
fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_output() {
        let mut sink = ConsoleDiagnostics::new(Vec::new());
        sink.net_transfer(&NetTransfer {
            kind: 2,
            src_addr: 0x1000,
            dst_addr: 0x2000,
            num_bytes: 64,
        });
        sink.packet(&Packet {
            direction: Direction::Outgoing,
            old_buf_addr: 0xbeef,
            bytes: b"GET\r\n".to_vec(),
        });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "net transfer: src: 0x1000, dst: 0x2000, n: 64\n\
             handle packet: size: 5, direction: 1, old_buf_addr: 0xbeef\n\
             content: GET\\r\\n\n"
        );
    }

    #[test]
    fn test_printable_escapes_binary() {
        assert_eq!(printable(&[b'a', 0x00, 0xff]), "a\\x00\\xff");
    }
}
