//! The current point array and the filters that decide which points take part.

use crate::data::types::{Point, PointId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Content/visibility filters applied to every point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterThresholds {
    /// Points above this share of flagged content are excluded.
    pub max_nsfw_percent: f32,
    /// Points whose name starts with this prefix (case-insensitive) are excluded.
    pub hidden_prefix: Option<String>,
}

impl Default for FilterThresholds {
    fn default() -> Self {
        Self {
            max_nsfw_percent: 100.0,
            hidden_prefix: None,
        }
    }
}

impl FilterThresholds {
    pub fn new(max_nsfw_percent: f32, hidden_prefix: Option<String>) -> Self {
        Self {
            max_nsfw_percent,
            hidden_prefix: hidden_prefix.filter(|p| !p.is_empty()),
        }
    }

    /// The include predicate.
    pub fn includes(&self, subreddit: &str, percent_nsfw: f32) -> bool {
        if percent_nsfw > self.max_nsfw_percent {
            return false;
        }
        match &self.hidden_prefix {
            Some(prefix) => !starts_with_ignore_case(subreddit, prefix),
            None => true,
        }
    }
}

fn starts_with_ignore_case(name: &str, prefix: &str) -> bool {
    let mut chars = name.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| chars.next() == Some(p))
}

/// Owns the current point array.
///
/// The array is replaced wholesale on every change; holders of a previous
/// `Arc<[Point]>` keep a consistent snapshot.
#[derive(Debug, Clone)]
pub struct PointStore {
    points: Arc<[Point]>,
    thresholds: FilterThresholds,
    included: usize,
    generation: u64,
}

impl Default for PointStore {
    fn default() -> Self {
        Self::new(FilterThresholds::default())
    }
}

impl PointStore {
    pub fn new(thresholds: FilterThresholds) -> Self {
        Self {
            points: Arc::from(Vec::new()),
            thresholds,
            included: 0,
            generation: 0,
        }
    }

    /// Replaces the dataset, returning the previous snapshot.
    ///
    /// Ids are reassigned to the dense array index and `include` is
    /// recomputed from the current thresholds.
    pub fn set_dataset(&mut self, points: Vec<Point>) -> Arc<[Point]> {
        let thresholds = &self.thresholds;
        let points: Vec<Point> = points
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.id = PointId(i as u32);
                p.include = thresholds.includes(&p.subreddit, p.percent_nsfw);
                p
            })
            .collect();
        self.replace(points)
    }

    /// Recomputes `include` for every point, returning the previous snapshot.
    pub fn set_filter_thresholds(&mut self, thresholds: FilterThresholds) -> Arc<[Point]> {
        self.thresholds = thresholds;
        let thresholds = &self.thresholds;
        let points: Vec<Point> = self
            .points
            .iter()
            .map(|p| Point {
                include: thresholds.includes(&p.subreddit, p.percent_nsfw),
                ..p.clone()
            })
            .collect();
        self.replace(points)
    }

    fn replace(&mut self, points: Vec<Point>) -> Arc<[Point]> {
        self.included = points.iter().filter(|p| p.include).count();
        self.generation += 1;
        log::debug!(
            "Point store generation {}: {} points, {} included",
            self.generation,
            points.len(),
            self.included
        );
        std::mem::replace(&mut self.points, Arc::from(points))
    }

    #[inline]
    pub fn points(&self) -> &Arc<[Point]> {
        &self.points
    }

    #[inline]
    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.get(id.index())
    }

    #[inline]
    pub fn thresholds(&self) -> &FilterThresholds {
        &self.thresholds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn included_count(&self) -> usize {
        self.included
    }

    pub fn included(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points.iter().filter(|p| p.include)
    }

    /// Bumped on every replacement of the point array.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
