//! The simple (unsigned) version-3 RTMP handshake.
//!
//! Both sides exchange three packets over the raw stream before any chunks
//! flow:
//!
//! ```text
//! Client -> Server : C0 (1 byte version) | C1 (1536 bytes)
//! Server -> Client : S0 (1 byte version) | S1 (1536 bytes) | S2 (echo of C1)
//! Client -> Server : C2 (echo of S1)
//! ```
//!
//! The 1536-byte bodies are random; the historic time fields in their first
//! eight bytes are treated as opaque, and the echo property is streamed
//! through without validation. Both roles block on `read_exact`/`write_all`,
//! so partial transfers on the raw stream are tolerated.

mod errors;

pub use self::errors::{HandshakeError, HandshakeStep};

use std::io::{Read, Write};

use log::debug;
use rand::Rng;

/// The only protocol version the simple handshake speaks.
pub const RTMP_VERSION: u8 = 3;

/// Size of the C1/C2/S1/S2 handshake packets.
pub const HANDSHAKE_PACKET_SIZE: usize = 1536;

/// Performs the server side of the handshake: read C0 + C1, send
/// S0 + S1 + S2, read C2.
///
/// Returns [`HandshakeError::UnsupportedVersion`] after consuming exactly one
/// byte, and before writing anything, if the client's version is not 3.
pub fn perform_server<S>(stream: &mut S) -> Result<(), HandshakeError>
where
    S: Read + Write,
{
    let mut version = [0u8; 1];
    read_packet(stream, &mut version, HandshakeStep::C0)?;
    if version[0] != RTMP_VERSION {
        return Err(HandshakeError::UnsupportedVersion {
            version: version[0],
        });
    }

    let mut client_body = vec![0u8; HANDSHAKE_PACKET_SIZE];
    read_packet(stream, &mut client_body, HandshakeStep::C1)?;

    write_packet(stream, &[RTMP_VERSION], HandshakeStep::S0)?;
    write_packet(stream, &random_body(), HandshakeStep::S1)?;
    write_packet(stream, &client_body, HandshakeStep::S2)?;
    flush_packets(stream, HandshakeStep::S2)?;

    // Our S1 comes back as C2; the bytes stream through unvalidated.
    let mut echo = vec![0u8; HANDSHAKE_PACKET_SIZE];
    read_packet(stream, &mut echo, HandshakeStep::C2)?;

    debug!("server handshake completed");
    Ok(())
}

/// Performs the client side of the handshake: send C0 + C1, read S0 + S1 +
/// S2, send C2.
pub fn perform_client<S>(stream: &mut S) -> Result<(), HandshakeError>
where
    S: Read + Write,
{
    write_packet(stream, &[RTMP_VERSION], HandshakeStep::C0)?;
    write_packet(stream, &random_body(), HandshakeStep::C1)?;
    flush_packets(stream, HandshakeStep::C1)?;

    let mut version = [0u8; 1];
    read_packet(stream, &mut version, HandshakeStep::S0)?;
    if version[0] != RTMP_VERSION {
        return Err(HandshakeError::UnsupportedVersion {
            version: version[0],
        });
    }

    let mut server_body = vec![0u8; HANDSHAKE_PACKET_SIZE];
    read_packet(stream, &mut server_body, HandshakeStep::S1)?;

    // S2 echoes our C1; nothing in it is validated.
    let mut echo = vec![0u8; HANDSHAKE_PACKET_SIZE];
    read_packet(stream, &mut echo, HandshakeStep::S2)?;

    write_packet(stream, &server_body, HandshakeStep::C2)?;
    flush_packets(stream, HandshakeStep::C2)?;

    debug!("client handshake completed");
    Ok(())
}

fn random_body() -> Vec<u8> {
    let mut body = vec![0u8; HANDSHAKE_PACKET_SIZE];
    rand::thread_rng().fill(&mut body[..]);
    body
}

fn read_packet<S>(stream: &mut S, buffer: &mut [u8], step: HandshakeStep) -> Result<(), HandshakeError>
where
    S: Read,
{
    stream
        .read_exact(buffer)
        .map_err(|source| HandshakeError::Read { step, source })
}

fn write_packet<S>(stream: &mut S, bytes: &[u8], step: HandshakeStep) -> Result<(), HandshakeError>
where
    S: Write,
{
    stream
        .write_all(bytes)
        .map_err(|source| HandshakeError::Write { step, source })
}

fn flush_packets<S>(stream: &mut S, step: HandshakeStep) -> Result<(), HandshakeError>
where
    S: Write,
{
    stream
        .flush()
        .map_err(|source| HandshakeError::Write { step, source })
}
