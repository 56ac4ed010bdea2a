use std::ffi::c_void;

use aidlink_client::Transmitter;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AidResult {
    Ok = 0,
    InvalidArgument = 1,
    ResolveError = 2,
    SocketError = 3,
    ConnectError = 4,
    RecvError = 5,
    HandshakeTimeout = 6,
    SendError = 7,
    Internal = 99,
}

#[allow(dead_code)]
pub const AID_OK: AidResult = AidResult::Ok;
#[allow(dead_code)]
pub const AID_ERR_INVALID_ARGUMENT: AidResult = AidResult::InvalidArgument;
#[allow(dead_code)]
pub const AID_ERR_RESOLVE: AidResult = AidResult::ResolveError;
#[allow(dead_code)]
pub const AID_ERR_SOCKET: AidResult = AidResult::SocketError;
#[allow(dead_code)]
pub const AID_ERR_CONNECT: AidResult = AidResult::ConnectError;
#[allow(dead_code)]
pub const AID_ERR_RECV: AidResult = AidResult::RecvError;
#[allow(dead_code)]
pub const AID_ERR_HANDSHAKE_TIMEOUT: AidResult = AidResult::HandshakeTimeout;
#[allow(dead_code)]
pub const AID_ERR_SEND: AidResult = AidResult::SendError;
#[allow(dead_code)]
pub const AID_ERR_INTERNAL: AidResult = AidResult::Internal;

pub const AID_FLAG_AUTO_GAIN_BIAS: u32 = 0x01;
pub const AID_DEFAULT_PORT: u32 = 5999;

pub type AidTransmitterHandle = *mut c_void;

pub(crate) struct TransmitterHandle {
    pub(crate) transmitter: Transmitter,
}
