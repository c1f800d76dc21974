pub mod effect;
pub mod file;
pub mod generation_session;
