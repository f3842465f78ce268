pub mod client;
pub mod error;
pub mod types;

pub use client::AtlasClient;
pub use error::AtlasError;
pub use types::{
    ArchiveCriteria, ArchiveRequest, ArchiveStatus, AutoScaling, ClusterRequest, ClusterResponse,
    ConnectionStrings, PartitionField, ProviderSettings,
};
