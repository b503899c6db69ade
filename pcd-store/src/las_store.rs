use std::path::Path;

use las::{
    point::{Classification, ScanDirection},
    Header, Reader, Writer,
};
use rayon::prelude::*;

use pcd_core::pointcloud::point::{Color, Point, PointAttributes, PointCloud};

use crate::{is_point_cloud_path, PointCloudStore, StoreError};

/// Header of the file a cloud was read from.
///
/// Writing with it keeps the point format, scale, offset, VLRs and extra
/// byte layout of the source file. Counts and bounds are recomputed.
#[derive(Debug, Clone)]
pub struct LasSchema {
    pub header: Header,
}

/// LAS and LAZ files through the `las` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct LasStore;

impl LasStore {
    pub fn new() -> Self {
        Self
    }
}

impl PointCloudStore for LasStore {
    type Schema = LasSchema;

    fn load(&self, path: &Path) -> Result<(PointCloud, LasSchema), StoreError> {
        if !is_point_cloud_path(path) {
            return Err(StoreError::UnsupportedExtension(path.to_path_buf()));
        }
        let read_error = |source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        };

        let start = std::time::Instant::now();
        let mut reader = Reader::from_path(path).map_err(read_error)?;
        let header = reader.header().clone();
        let las_points = reader
            .points()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_error)?;

        let points: Vec<Point> = las_points.into_par_iter().map(from_las_point).collect();
        log::debug!(
            "read {} points from {:?} in {:?}",
            points.len(),
            path,
            start.elapsed()
        );

        Ok((PointCloud::new(points), LasSchema { header }))
    }

    fn write(
        &self,
        path: &Path,
        point_cloud: &PointCloud,
        schema: &LasSchema,
    ) -> Result<(), StoreError> {
        let write_error = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let las_points = point_cloud
            .points
            .par_iter()
            .map(to_las_point)
            .collect::<Result<Vec<_>, _>>()
            .map_err(write_error)?;

        let mut writer = Writer::from_path(path, schema.header.clone()).map_err(write_error)?;
        for las_point in las_points {
            writer.write_point(las_point).map_err(write_error)?;
        }
        writer.close().map_err(write_error)?;

        log::debug!("wrote {} points to {:?}", point_cloud.len(), path);
        Ok(())
    }
}

fn from_las_point(las_point: las::Point) -> Point {
    let color = las_point.color.map(|c| Color {
        r: c.red,
        g: c.green,
        b: c.blue,
    });

    let attributes = PointAttributes {
        intensity: las_point.intensity,
        return_number: las_point.return_number,
        number_of_returns: las_point.number_of_returns,
        scan_direction_left_to_right: las_point.scan_direction == ScanDirection::LeftToRight,
        is_edge_of_flight_line: las_point.is_edge_of_flight_line,
        classification: u8::from(las_point.classification),
        is_synthetic: las_point.is_synthetic,
        is_key_point: las_point.is_key_point,
        is_withheld: las_point.is_withheld,
        is_overlap: las_point.is_overlap,
        scanner_channel: las_point.scanner_channel,
        scan_angle: las_point.scan_angle,
        user_data: las_point.user_data,
        point_source_id: las_point.point_source_id,
        gps_time: las_point.gps_time,
        nir: las_point.nir,
        extra_bytes: las_point.extra_bytes,
    };

    Point {
        x: las_point.x,
        y: las_point.y,
        z: las_point.z,
        color,
        attributes,
    }
}

fn to_las_point(point: &Point) -> Result<las::Point, las::Error> {
    let attributes = &point.attributes;
    let scan_direction = if attributes.scan_direction_left_to_right {
        ScanDirection::LeftToRight
    } else {
        ScanDirection::RightToLeft
    };

    Ok(las::Point {
        x: point.x,
        y: point.y,
        z: point.z,
        intensity: attributes.intensity,
        return_number: attributes.return_number,
        number_of_returns: attributes.number_of_returns,
        scan_direction,
        is_edge_of_flight_line: attributes.is_edge_of_flight_line,
        classification: Classification::new(attributes.classification)?,
        is_synthetic: attributes.is_synthetic,
        is_key_point: attributes.is_key_point,
        is_withheld: attributes.is_withheld,
        is_overlap: attributes.is_overlap,
        scanner_channel: attributes.scanner_channel,
        scan_angle: attributes.scan_angle,
        user_data: attributes.user_data,
        point_source_id: attributes.point_source_id,
        gps_time: attributes.gps_time,
        color: point.color.map(|c| las::Color::new(c.r, c.g, c.b)),
        nir: attributes.nir,
        extra_bytes: attributes.extra_bytes.clone(),
        ..Default::default()
    })
}
