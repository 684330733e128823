pub mod m202510170001_create_class_members;
pub mod m202510170002_create_attendance_sessions;
pub mod m202510170003_create_attendance_records;
