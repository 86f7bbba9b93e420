//! Protocol error
use std::{fmt, str::Utf8Error};

use super::{Capabilities, server};

/// An error when translating buffer from or to MySQL.
pub enum ProtocolError {
    /// Packet header does not match the expected packet.
    Unexpected {
        expect: &'static str,
        found: u8,
    },
    /// Packet content is truncated or invalid.
    Malformed {
        reason: &'static str,
    },
    /// Server sent non utf8 string.
    Utf8(Utf8Error),
    /// Server speaks a protocol version other than 10.
    UnsupportedVersion {
        version: u8,
    },
    /// Server lacks a capability this client requires.
    MissingCapability {
        capability: Capabilities,
    },
    /// SSL is required but the server does not advertise it.
    TlsUnavailable,
    /// Received packet sequence id out of order.
    SequenceMismatch {
        expect: u8,
        found: u8,
    },
    /// Client message wrote different amount of bytes than it declared.
    FrameSizeMismatch {
        declared: u32,
        written: usize,
    },
    /// Client message does not fit in a single packet.
    FrameTooLarge {
        size: u32,
    },
    /// Handshake operation called in the wrong state.
    InvalidPhase {
        phase: &'static str,
        operation: &'static str,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(reason: &'static str) -> ProtocolError {
        Self::Malformed { reason }
    }

    pub(crate) fn unexpected(expect: &'static str, found: u8) -> ProtocolError {
        Self::Unexpected { expect, found }
    }

    pub(crate) fn invalid_phase(phase: &'static str, operation: &'static str) -> ProtocolError {
        Self::InvalidPhase { phase, operation }
    }
}

impl From<Utf8Error> for ProtocolError {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8(value)
    }
}

impl From<bytes::TryGetError> for ProtocolError {
    fn from(_: bytes::TryGetError) -> Self {
        Self::malformed("unexpected end of packet")
    }
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::Unexpected { expect, found } => {
                write!(f, "expected packet `{expect}` found `{}`", server::packet_name(found))
            },
            ProtocolError::Malformed { reason } => write!(f, "malformed packet: {reason}"),
            ProtocolError::Utf8(ref e) => write!(f, "{e}"),
            ProtocolError::UnsupportedVersion { version } => {
                write!(f, "unsupported protocol version: {version}")
            },
            ProtocolError::MissingCapability { capability } => {
                write!(f, "server does not support {capability:?}")
            },
            ProtocolError::TlsUnavailable => f.write_str("SSL required but not supported by server"),
            ProtocolError::SequenceMismatch { expect, found } => {
                write!(f, "packet out of order, expected sequence {expect} found {found}")
            },
            ProtocolError::FrameSizeMismatch { declared, written } => {
                write!(f, "client message declared {declared} bytes but wrote {written}")
            },
            ProtocolError::FrameTooLarge { size } => {
                write!(f, "client message of {size} bytes exceed single packet limit")
            },
            ProtocolError::InvalidPhase { phase, operation } => {
                write!(f, "cannot {operation} in `{phase}` phase")
            },
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An error when constructing a value in a structurally invalid state.
///
/// This is caller error, detected eagerly at construction instead of at
/// transmission.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PreconditionViolation {
    reason: &'static str,
}

impl PreconditionViolation {
    pub(crate) const fn new(reason: &'static str) -> PreconditionViolation {
        Self { reason }
    }

    /// Returns the violated requirement.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

impl std::error::Error for PreconditionViolation { }

impl fmt::Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "precondition violated: {}", self.reason)
    }
}

impl fmt::Debug for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
