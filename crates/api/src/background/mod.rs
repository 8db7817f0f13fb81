pub mod session_sweeper;
