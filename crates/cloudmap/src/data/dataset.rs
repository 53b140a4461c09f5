//! Validated ingestion of the raw dataset payload.
//!
//! The data service ships one record per community with a label for every
//! precomputed cluster count. Everything is checked here, once, so that the
//! rest of the crate only ever sees well-formed [`Point`]s.

use crate::data::types::Point;
use crate::error::DatasetError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// One community as delivered by the data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPoint {
    pub subreddit: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// One label per entry of [`RawDataset::cluster_counts`].
    #[serde(default)]
    pub cluster: Vec<u32>,
    pub percent_nsfw: f32,
}

/// The payload as delivered; unknown fields such as hull meshes are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDataset {
    pub data: Vec<RawPoint>,
    #[serde(default)]
    pub cluster_counts: Vec<u32>,
}

#[derive(Debug, Clone)]
struct Record {
    subreddit: Arc<str>,
    position: Vec3,
    clusters: Vec<u32>,
    percent_nsfw: f32,
}

/// A validated dataset, ready to be materialized for one cluster count.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Record>,
    cluster_counts: Vec<u32>,
}

impl Dataset {
    /// Validates `raw` against the domain half-extent `half_extent`.
    pub fn from_raw(raw: RawDataset, half_extent: f32) -> Result<Self, DatasetError> {
        let RawDataset {
            data,
            cluster_counts,
        } = raw;

        let mut seen: HashMap<String, usize> = HashMap::with_capacity(data.len());
        let mut records = Vec::with_capacity(data.len());

        for (index, p) in data.into_iter().enumerate() {
            if p.subreddit.trim().is_empty() {
                return Err(DatasetError::EmptyName { index });
            }
            if let Some(&first) = seen.get(&p.subreddit) {
                return Err(DatasetError::DuplicateName {
                    name: p.subreddit,
                    first,
                    second: index,
                });
            }

            for (axis, value) in [('x', p.x), ('y', p.y), ('z', p.z)] {
                if !value.is_finite() {
                    return Err(DatasetError::NonFinite {
                        index,
                        name: p.subreddit,
                        axis,
                        value,
                    });
                }
                if value.abs() > half_extent {
                    return Err(DatasetError::OutOfDomain {
                        index,
                        name: p.subreddit,
                        axis,
                        value,
                        half_extent,
                    });
                }
            }

            if !(0.0..=100.0).contains(&p.percent_nsfw) {
                return Err(DatasetError::NsfwPercent {
                    index,
                    name: p.subreddit,
                    value: p.percent_nsfw,
                });
            }

            if p.cluster.len() != cluster_counts.len() {
                return Err(DatasetError::ClusterArity {
                    index,
                    name: p.subreddit,
                    found: p.cluster.len(),
                    expected: cluster_counts.len(),
                });
            }
            if let Some((&label, &count)) = p
                .cluster
                .iter()
                .zip(&cluster_counts)
                .find(|(label, count)| **label >= **count)
            {
                return Err(DatasetError::ClusterLabel {
                    index,
                    name: p.subreddit,
                    label,
                    count,
                });
            }

            seen.insert(p.subreddit.clone(), index);
            records.push(Record {
                subreddit: Arc::from(p.subreddit),
                position: Vec3::new(p.x, p.y, p.z),
                clusters: p.cluster,
                percent_nsfw: p.percent_nsfw,
            });
        }

        log::debug!(
            "Validated dataset: {} points, cluster counts {:?}",
            records.len(),
            cluster_counts
        );

        Ok(Self {
            records,
            cluster_counts,
        })
    }

    /// Parses and validates a JSON payload.
    pub fn from_json_slice(bytes: &[u8], half_extent: f32) -> Result<Self, DatasetError> {
        let raw: RawDataset = serde_json::from_slice(bytes)?;
        Self::from_raw(raw, half_extent)
    }

    /// Parses and validates a JSON payload from a reader.
    pub fn from_reader<R: Read>(reader: R, half_extent: f32) -> Result<Self, DatasetError> {
        let raw: RawDataset = serde_json::from_reader(reader)?;
        Self::from_raw(raw, half_extent)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The cluster counts a caller can pick from, by index.
    #[inline]
    pub fn cluster_counts(&self) -> &[u32] {
        &self.cluster_counts
    }

    /// Materializes the point array labelled for `cluster_index`.
    ///
    /// A dataset without cluster counts accepts index 0 and labels every point
    /// with cluster 0. All points come back included; filtering is the store's job.
    pub fn points(&self, cluster_index: usize) -> Result<Vec<Point>, DatasetError> {
        let unclustered = self.cluster_counts.is_empty() && cluster_index == 0;
        if !unclustered && cluster_index >= self.cluster_counts.len() {
            return Err(DatasetError::ClusterIndex {
                index: cluster_index,
                available: self.cluster_counts.len(),
            });
        }

        Ok(self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let cluster = r.clusters.get(cluster_index).copied().unwrap_or(0);
                Point::new(
                    i as u32,
                    r.subreddit.clone(),
                    r.position,
                    cluster,
                    r.percent_nsfw,
                )
            })
            .collect())
    }
}
