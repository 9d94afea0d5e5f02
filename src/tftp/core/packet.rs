use std::fmt;
use std::io::Read;

/// Largest datagram the protocol produces: 4 byte header plus one
/// payload block.
pub const DATAGRAM_SIZE: usize = 516;
/// Payload bytes carried by a full DATA packet. A shorter block marks
/// the end of a transfer.
pub const BLOCK_SIZE: usize = 512;

/// TFTP opcodes. Opcode 2 (write request) is reserved by the protocol
/// but deliberately absent, this server is read-only and never accepts
/// or produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    Rrq = 1,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Opcode::Rrq),
            3 => Some(Opcode::Data),
            4 => Some(Opcode::Ack),
            5 => Some(Opcode::Error),
            _ => None,
        }
    }
}

/// Error codes defined by RFC 1350. Decoding maps out-of-range values
/// to [`ErrorCode::Unknown`] instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 0,
    NotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTransferId = 5,
    FileExists = 6,
    NoSuchUser = 7,
}

impl From<u16> for ErrorCode {
    fn from(value: u16) -> Self {
        match value {
            1 => ErrorCode::NotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTransferId,
            6 => ErrorCode::FileExists,
            7 => ErrorCode::NoSuchUser,
            _ => ErrorCode::Unknown,
        }
    }
}

/// Decoding failures, one variant per wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    InvalidRequest(&'static str),
    InvalidData,
    InvalidAck,
    InvalidError,
    UnknownPacketType,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::InvalidRequest(reason) => write!(f, "invalid read request: {}", reason),
            PacketError::InvalidData => write!(f, "invalid DATA packet"),
            PacketError::InvalidAck => write!(f, "invalid ACK packet"),
            PacketError::InvalidError => write!(f, "invalid ERROR packet"),
            PacketError::UnknownPacketType => write!(f, "unknown packet type"),
        }
    }
}

impl std::error::Error for PacketError {}

/// Read request: `opcode . filename . NUL . mode . NUL`. Only the
/// "octet" mode (case-insensitive) is accepted; trailing option bytes
/// after the mode terminator are ignored and never acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadReq {
    pub filename: String,
    pub mode: String,
}

impl ReadReq {
    #[allow(dead_code)]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mode: "octet".to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn serialize(&self) -> Vec<u8> {
        let mode = if self.mode.is_empty() {
            "octet"
        } else {
            self.mode.as_str()
        };
        let mut buf = Vec::with_capacity(2 + self.filename.len() + 1 + mode.len() + 1);
        buf.extend_from_slice(&(Opcode::Rrq as u16).to_be_bytes());
        buf.extend_from_slice(self.filename.as_bytes());
        buf.push(0);
        buf.extend_from_slice(mode.as_bytes());
        buf.push(0);
        buf
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, PacketError> {
        let (opcode, rest) =
            split_opcode(buf).ok_or(PacketError::InvalidRequest("truncated header"))?;
        if opcode != Opcode::Rrq as u16 {
            return Err(PacketError::InvalidRequest("not a read request"));
        }

        let (filename, rest) =
            take_cstr(rest).ok_or(PacketError::InvalidRequest("unterminated filename"))?;
        if filename.is_empty() {
            return Err(PacketError::InvalidRequest("empty filename"));
        }
        let filename = std::str::from_utf8(filename)
            .map_err(|_| PacketError::InvalidRequest("filename is not valid utf-8"))?;

        let (mode, _options) =
            take_cstr(rest).ok_or(PacketError::InvalidRequest("unterminated mode"))?;
        if mode.is_empty() {
            return Err(PacketError::InvalidRequest("empty mode"));
        }
        let mode = std::str::from_utf8(mode)
            .map_err(|_| PacketError::InvalidRequest("mode is not valid utf-8"))?;
        if !mode.eq_ignore_ascii_case("octet") {
            return Err(PacketError::InvalidRequest("only octet transfers are supported"));
        }

        Ok(Self {
            filename: filename.to_string(),
            mode: mode.to_string(),
        })
    }
}

/// One decoded datagram. [`Packet::deserialize`] sniffs the opcode and
/// dispatches to the matching decoder, so callers match on the variant
/// instead of guessing the type up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq(ReadReq),
    Data { block: u16, payload: Vec<u8> },
    Ack(u16),
    Error { code: ErrorCode, message: String },
}

impl Packet {
    /// Serializes the packet. DATA payloads are expected to stay within
    /// [`BLOCK_SIZE`]; [`DataStream`] guarantees that for outgoing
    /// traffic.
    #[allow(dead_code)]
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Packet::Rrq(req) => req.serialize(),
            Packet::Data { block, payload } => {
                let mut buf = Vec::with_capacity(4 + payload.len());
                buf.extend_from_slice(&(Opcode::Data as u16).to_be_bytes());
                buf.extend_from_slice(&block.to_be_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            Packet::Ack(block) => {
                let mut buf = Vec::with_capacity(4);
                buf.extend_from_slice(&(Opcode::Ack as u16).to_be_bytes());
                buf.extend_from_slice(&block.to_be_bytes());
                buf
            }
            Packet::Error { code, message } => {
                let mut buf = Vec::with_capacity(4 + message.len() + 1);
                buf.extend_from_slice(&(Opcode::Error as u16).to_be_bytes());
                buf.extend_from_slice(&(*code as u16).to_be_bytes());
                buf.extend_from_slice(message.as_bytes());
                buf.push(0);
                buf
            }
        }
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, PacketError> {
        let opcode = buf
            .get(..2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or(PacketError::UnknownPacketType)?;

        match Opcode::from_u16(opcode) {
            Some(Opcode::Rrq) => Ok(Packet::Rrq(ReadReq::deserialize(buf)?)),
            Some(Opcode::Data) => Self::deserialize_data(buf),
            Some(Opcode::Ack) => Self::deserialize_ack(buf),
            Some(Opcode::Error) => Self::deserialize_error(buf),
            None => Err(PacketError::UnknownPacketType),
        }
    }

    fn deserialize_data(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < 4 || buf.len() > DATAGRAM_SIZE {
            return Err(PacketError::InvalidData);
        }
        if u16::from_be_bytes([buf[0], buf[1]]) != Opcode::Data as u16 {
            return Err(PacketError::InvalidData);
        }

        Ok(Packet::Data {
            block: u16::from_be_bytes([buf[2], buf[3]]),
            payload: buf[4..].to_vec(),
        })
    }

    fn deserialize_ack(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < 4 {
            return Err(PacketError::InvalidAck);
        }
        if u16::from_be_bytes([buf[0], buf[1]]) != Opcode::Ack as u16 {
            return Err(PacketError::InvalidAck);
        }

        // Trailing bytes are tolerated, only the block number matters.
        Ok(Packet::Ack(u16::from_be_bytes([buf[2], buf[3]])))
    }

    fn deserialize_error(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < 4 {
            return Err(PacketError::InvalidError);
        }
        if u16::from_be_bytes([buf[0], buf[1]]) != Opcode::Error as u16 {
            return Err(PacketError::InvalidError);
        }

        let (message, _) = take_cstr(&buf[4..]).ok_or(PacketError::InvalidError)?;
        let message = String::from_utf8_lossy(message).into_owned();

        Ok(Packet::Error {
            code: ErrorCode::from(u16::from_be_bytes([buf[2], buf[3]])),
            message,
        })
    }
}

fn split_opcode(buf: &[u8]) -> Option<(u16, &[u8])> {
    if buf.len() < 2 {
        return None;
    }
    Some((u16::from_be_bytes([buf[0], buf[1]]), &buf[2..]))
}

fn take_cstr(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let nul = buf.iter().position(|&b| b == 0)?;
    Some((&buf[..nul], &buf[nul + 1..]))
}

/// Lazily encodes a payload source as successive DATA datagrams.
///
/// The block counter starts at zero and is advanced (with wrap-around)
/// before each datagram is built, so the first block on the wire is
/// block 1. The source is drained at most [`BLOCK_SIZE`] bytes per
/// call; running out of bytes is not an error, the resulting short
/// datagram is what tells the peer the transfer is over.
pub struct DataStream<R> {
    source: R,
    block: u16,
}

impl<R: Read> DataStream<R> {
    pub fn new(source: R) -> Self {
        Self { source, block: 0 }
    }

    /// Block number of the most recently built datagram.
    pub fn block(&self) -> u16 {
        self.block
    }

    /// Builds the serialized DATA datagram for the next block.
    pub fn next_block(&mut self) -> std::io::Result<Vec<u8>> {
        self.block = self.block.wrapping_add(1);

        let mut datagram = Vec::with_capacity(DATAGRAM_SIZE);
        datagram.extend_from_slice(&(Opcode::Data as u16).to_be_bytes());
        datagram.extend_from_slice(&self.block.to_be_bytes());

        (&mut self.source)
            .take(BLOCK_SIZE as u64)
            .read_to_end(&mut datagram)?;

        Ok(datagram)
    }
}
