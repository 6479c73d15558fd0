pub mod buffer;
pub mod capture;
pub mod device;
pub mod dtype;
pub mod error;
pub mod layout;
