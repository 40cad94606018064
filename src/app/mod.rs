pub mod ports;
pub mod session_use_case;
