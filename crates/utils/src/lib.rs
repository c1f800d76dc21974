pub mod logging;
pub mod number;
pub mod response;
