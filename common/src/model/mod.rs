pub mod csv_result;
pub mod notification;
