pub mod attendance_record;
pub mod attendance_session;
pub mod class_member;

pub use attendance_record::Entity as AttendanceRecord;
pub use attendance_session::Entity as AttendanceSession;
pub use class_member::Entity as ClassMember;
