pub mod config;
pub mod sum;
pub mod tftp;
