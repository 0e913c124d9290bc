pub mod cors;
pub mod protocol_version;
