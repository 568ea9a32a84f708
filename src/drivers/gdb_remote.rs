//! GDB Remote Serial Protocol backend.
//!
//! Talks to a gdbserver (OpenOCD, pyOCD, J-Link, QEMU) over any byte stream,
//! usually a TCP connection. Only the packets needed by the inspector are
//! spoken:
//!
//! - `m addr,len` to read memory
//! - `p n` / `P n=value` to read and write a register
//!
//! Packets are framed as `$payload#cs` with a modulo-256 checksum and
//! acknowledged with `+`/`-`.

use std::cell::RefCell;
use std::io::{BufReader, Read, Write};
use std::net::TcpStream;

use memory_addr::VirtAddr;
use serde::{Deserialize, Serialize};

use crate::hal::{Reg, Target};
use crate::{RtosError, RtosResult};

/// Largest memory read issued in one `m` packet.
const MAX_READ_CHUNK: usize = 0x200;

/// Number of times a packet is resent after a `-` acknowledgement.
const MAX_RETRIES: usize = 3;

/// Register numbers used on the wire.
///
/// `r0..=r15` are always numbered 0..=15. The rest depends on the target
/// description the gdbserver publishes (`maint print remote-registers` in GDB
/// lists it); the defaults assume `xpsr, msp, psp, fpscr` right after `pc`,
/// followed by `s0..s31`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterMap {
    pub xpsr: u32,
    pub msp: u32,
    pub psp: u32,
    pub fpscr: u32,
    /// Number of `s0`; `sN` is `s0 + N`.
    pub s0: u32,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            xpsr: 16,
            msp: 17,
            psp: 18,
            fpscr: 19,
            s0: 20,
        }
    }
}

impl RegisterMap {
    /// Returns the wire number of `reg`.
    pub fn number(&self, reg: Reg) -> u32 {
        match reg {
            Reg::R(n) => n as u32,
            Reg::Xpsr => self.xpsr,
            Reg::Msp => self.msp,
            Reg::Psp => self.psp,
            Reg::Fpscr => self.fpscr,
            Reg::S(n) => self.s0 + n as u32,
        }
    }
}

/// Modulo-256 sum of the payload bytes.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Frames a payload as `$payload#cs`, escaping the reserved characters.
pub fn encode_packet(payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len());
    for &b in payload {
        if matches!(b, b'$' | b'#' | b'}' | b'*') {
            body.push(b'}');
            body.push(b ^ 0x20);
        } else {
            body.push(b);
        }
    }

    let mut packet = Vec::with_capacity(body.len() + 4);
    packet.push(b'$');
    packet.extend_from_slice(&body);
    packet.push(b'#');
    packet.extend_from_slice(format!("{:02x}", checksum(&body)).as_bytes());
    packet
}

/// Undoes `}` escapes and `*` run-length encoding of a received payload.
pub fn decode_payload(body: &[u8]) -> RtosResult<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut bytes = body.iter().copied();
    while let Some(b) = bytes.next() {
        match b {
            b'}' => {
                let escaped = bytes
                    .next()
                    .ok_or_else(|| RtosError::Remote("truncated escape".into()))?;
                out.push(escaped ^ 0x20);
            }
            b'*' => {
                let count = bytes
                    .next()
                    .ok_or_else(|| RtosError::Remote("truncated run-length".into()))?;
                let last = *out
                    .last()
                    .ok_or_else(|| RtosError::Remote("run-length without a byte".into()))?;
                let repeat = count
                    .checked_sub(29)
                    .ok_or_else(|| RtosError::Remote("bad run-length count".into()))?;
                out.extend(std::iter::repeat_n(last, repeat as usize));
            }
            _ => out.push(b),
        }
    }
    Ok(out)
}

/// Decodes a string of hex digit pairs.
pub fn decode_hex(hex: &[u8]) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(s, 16).ok()
        })
        .collect()
}

/// Encodes bytes as lowercase hex digit pairs.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Returns the error code of an `Exx` reply.
fn error_reply(reply: &[u8]) -> Option<&str> {
    match reply {
        [b'E', code @ ..] if code.len() == 2 => std::str::from_utf8(code).ok(),
        _ => None,
    }
}

/// Framing and acknowledgement over a byte stream.
struct Connection<S: Read + Write> {
    stream: BufReader<S>,
}

impl<S: Read + Write> Connection<S> {
    fn read_byte(&mut self) -> RtosResult<u8> {
        let mut byte = [0u8; 1];
        self.stream.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn send_raw(&mut self, bytes: &[u8]) -> RtosResult<()> {
        let stream = self.stream.get_mut();
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    /// Sends a packet and waits for the `+` acknowledgement.
    fn send_packet(&mut self, payload: &[u8]) -> RtosResult<()> {
        let packet = encode_packet(payload);
        for _ in 0..=MAX_RETRIES {
            trace!("-> {}", String::from_utf8_lossy(&packet));
            self.send_raw(&packet)?;
            loop {
                match self.read_byte()? {
                    b'+' => return Ok(()),
                    b'-' => break,
                    // Stray output such as a late stop reply.
                    _ => continue,
                }
            }
        }
        Err(RtosError::Remote("packet rejected by the server".into()))
    }

    /// Receives one packet, acknowledging it.
    fn recv_packet(&mut self) -> RtosResult<Vec<u8>> {
        for _ in 0..=MAX_RETRIES {
            while self.read_byte()? != b'$' {}

            let mut body = Vec::new();
            loop {
                match self.read_byte()? {
                    b'#' => break,
                    b => body.push(b),
                }
            }
            let sum = [self.read_byte()?, self.read_byte()?];
            let expected = decode_hex(&sum).and_then(|v| v.first().copied());

            if expected == Some(checksum(&body)) {
                self.send_raw(b"+")?;
                trace!("<- {}", String::from_utf8_lossy(&body));
                return decode_payload(&body);
            }
            warn!("bad checksum on reply, asking for retransmission");
            self.send_raw(b"-")?;
        }
        Err(RtosError::Remote("reply checksum keeps failing".into()))
    }

    fn transact(&mut self, payload: &[u8]) -> RtosResult<Vec<u8>> {
        self.send_packet(payload)?;
        self.recv_packet()
    }
}

/// A [`Target`] reached through a gdbserver.
pub struct GdbRemote<S: Read + Write> {
    conn: RefCell<Connection<S>>,
    regs: RegisterMap,
}

impl GdbRemote<TcpStream> {
    /// Connects to a gdbserver at `address` (`host:port`).
    pub fn connect(address: &str, regs: RegisterMap) -> RtosResult<Self> {
        info!("connecting to gdbserver at {}", address);
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, regs))
    }
}

impl<S: Read + Write> GdbRemote<S> {
    /// Speaks the protocol over an already open stream.
    pub fn new(stream: S, regs: RegisterMap) -> Self {
        Self {
            conn: RefCell::new(Connection {
                stream: BufReader::new(stream),
            }),
            regs,
        }
    }

    fn transact(&self, payload: &str) -> RtosResult<Vec<u8>> {
        self.conn.borrow_mut().transact(payload.as_bytes())
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.conn.into_inner().stream.into_inner()
    }
}

impl<S: Read + Write> Target for GdbRemote<S> {
    fn read_memory(&self, addr: VirtAddr, buf: &mut [u8]) -> RtosResult<()> {
        let base = addr.as_usize();
        for (i, chunk) in buf.chunks_mut(MAX_READ_CHUNK).enumerate() {
            let start = base + i * MAX_READ_CHUNK;
            let reply = self.transact(&format!("m{:x},{:x}", start, chunk.len()))?;
            if let Some(code) = error_reply(&reply) {
                debug!("memory read at {:#x} failed with E{}", start, code);
                return Err(RtosError::MemoryRead { addr: start });
            }
            let bytes = decode_hex(&reply)
                .filter(|b| b.len() == chunk.len())
                .ok_or(RtosError::MemoryRead { addr: start })?;
            chunk.copy_from_slice(&bytes);
        }
        Ok(())
    }

    fn read_register(&self, reg: Reg) -> RtosResult<u32> {
        let reply = self.transact(&format!("p{:x}", self.regs.number(reg)))?;
        // `xxxxxxxx` marks a register the server cannot read.
        let bytes = decode_hex(&reply)
            .filter(|b| b.len() >= 4)
            .ok_or(RtosError::RegisterAccess { reg })?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn write_register(&mut self, reg: Reg, value: u32) -> RtosResult<()> {
        let packet = format!(
            "P{:x}={}",
            self.regs.number(reg),
            encode_hex(&value.to_le_bytes())
        );
        match self.transact(&packet)?.as_slice() {
            b"OK" => Ok(()),
            _ => Err(RtosError::RegisterAccess { reg }),
        }
    }
}
