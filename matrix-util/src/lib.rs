pub mod common_io;
pub mod mtx_io;
