mod service;

pub use service::Monitor;
