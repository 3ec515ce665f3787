pub mod file;
pub mod media;
pub mod upload;

pub use file::{FileRecord, FileStatus};
pub use media::{MediaProbe, QualityTier, RemoteObject, ResourceKind};
pub use upload::{StreamEntry, UploadInput, UploadResult, UploadSource};
