//! Attendance session protocol and attendance recording.
//!
//! Storage and roster lookups are reached through traits so the binary can
//! inject the database-backed implementations and tests can inject fakes.

pub mod attendance_record;
pub mod attendance_session;
pub mod directory;
pub mod error;
pub mod token_rotator;

#[cfg(test)]
mod test_support;

pub use error::AttendanceError;
