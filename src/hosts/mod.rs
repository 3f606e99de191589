//! Concrete file-hosting service implementations.

pub mod gdrive;

pub use gdrive::GoogleDriveHost;
