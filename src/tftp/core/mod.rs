//! TFTP 核心协议实现
//!
//! 本模块包含 TFTP 协议的核心组件：
//! - `packet`: 协议包的序列化和反序列化，以及 DATA 块编码器

mod packet;

// 公开核心类型
pub use packet::{
    BLOCK_SIZE, DATAGRAM_SIZE, DataStream, ErrorCode, Opcode, Packet, PacketError, ReadReq,
};
