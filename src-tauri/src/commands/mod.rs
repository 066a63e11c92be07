pub mod scan;
pub mod session;
pub mod view;
