pub mod format;
pub mod settings;
pub mod version;
