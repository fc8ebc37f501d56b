pub mod filename;
pub mod flash;
pub mod response;
pub mod upload;
