// Gateway commands
pub mod apply;

// Offline commands
pub mod validate;
