use std::fmt;
use std::io;
use thiserror::Error;

/// Identifies which handshake packet a failed read or write belonged to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandshakeStep {
    C0,
    C1,
    C2,
    S0,
    S1,
    S2,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeStep::C0 => "c0",
            HandshakeStep::C1 => "c1",
            HandshakeStep::C2 => "c2",
            HandshakeStep::S0 => "s0",
            HandshakeStep::S1 => "s1",
            HandshakeStep::S2 => "s2",
        };

        f.write_str(name)
    }
}

/// An enumeration defining all the possible errors that could occur during
/// the RTMP handshake. Every variant is fatal for the connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer's version byte was not 3. Nothing beyond that byte has been
    /// consumed and nothing has been written when this is returned.
    #[error("peer requested RTMP version {version}, only version 3 is supported")]
    UnsupportedVersion { version: u8 },

    /// The underlying stream failed while reading the named packet.
    #[error("handshake read failed at {step}: {source}")]
    Read { step: HandshakeStep, source: io::Error },

    /// The underlying stream failed while writing the named packet.
    #[error("handshake write failed at {step}: {source}")]
    Write { step: HandshakeStep, source: io::Error },
}
