use rand::RngCore;
use uuid::Uuid;

/// Source of opaque identifiers for attendance sessions.
pub trait IdProvider: Send + Sync {
    /// External-facing, immutable session identifier.
    fn session_id(&self) -> String;

    /// A fresh QR credential. Must be unguessable.
    fn token(&self) -> String;
}

/// UUIDv4 session ids and 128-bit hex tokens from the OS RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdProvider for RandomIds {
    fn session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn token(&self) -> String {
        let mut buf = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut buf);
        hex::encode(buf)
    }
}
