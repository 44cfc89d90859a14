//! Configuration: settings file and image selection

pub mod images;
pub mod settings;
