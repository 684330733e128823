//! Storage adapters for the attendance protocol.
//!
//! The traits are the seams the services depend on; the `*Repository`
//! structs are the SeaORM implementations. Atomicity lives here, not in the
//! services: session mutations compare-and-swap on `version`, and ledger
//! inserts rely on the UNIQUE `dedup_key` index.

pub mod attendance_repository;
pub mod session_repository;

pub use attendance_repository::{AttendanceLedger, AttendanceRepository, InsertOutcome, NewRecord};
pub use session_repository::{NewSession, SessionRepository, SessionStore};
