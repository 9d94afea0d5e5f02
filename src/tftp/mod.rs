//! TFTP (Trivial File Transfer Protocol) 只读服务器实现
//!
//! 本模块实现了 [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350)
//! 的只读子集：仅支持读请求（RRQ）和 octet 模式，所有客户端收到的都是
//! 同一份启动时加载的载荷，不支持写请求（WRQ）。
//!
//! ## 模块结构
//!
//! ```text
//! tftp/
//! ├── core/           # 核心协议实现
//! │   └── packet      # 协议包序列化/反序列化、DATA 块编码器
//! │
//! └── server/         # TFTP 服务器
//!     ├── server_impl # 监听循环，分发客户端请求
//!     ├── worker      # 传输工作线程
//!     └── config      # 服务器配置
//! ```
//!
//! ## 使用示例
//!
//! ### 启动 TFTP 服务器
//!
//! ```rust,no_run
//! use octetd::tftp::server::Server;
//! use std::time::Duration;
//!
//! let server = Server::new(std::fs::read("payload.bin").unwrap())
//!     .with_retries(10)
//!     .with_timeout(Duration::from_secs(6));
//!
//! server.listen_and_serve("0.0.0.0:6999").unwrap();
//! ```

// 子模块
pub mod core;
pub mod server;
