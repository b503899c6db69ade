use std::{ffi::OsStr, path::Path};

use pcd_core::pointcloud::point::PointCloud;

mod error;
pub mod las_store;

pub use error::StoreError;
pub use las_store::{LasSchema, LasStore};

/// Loads whole clouds from files and writes filtered subsets back.
pub trait PointCloudStore {
    /// Whatever is needed to write points back in their original layout.
    type Schema;

    fn load(&self, path: &Path) -> Result<(PointCloud, Self::Schema), StoreError>;

    /// Overwrites `path` with `point_cloud`, laid out as described by `schema`.
    fn write(
        &self,
        path: &Path,
        point_cloud: &PointCloud,
        schema: &Self::Schema,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
}

pub fn get_extension(path: &Path) -> Option<Extension> {
    let extension = path.extension().and_then(OsStr::to_str)?;
    match extension.to_ascii_lowercase().as_str() {
        "las" => Some(Extension::Las),
        "laz" => Some(Extension::Laz),
        _ => None,
    }
}

pub fn is_point_cloud_path(path: &Path) -> bool {
    get_extension(path).is_some()
}
