pub mod service;
pub mod ticket;
pub mod window;
