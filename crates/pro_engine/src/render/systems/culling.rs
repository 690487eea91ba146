//! Per-entity frustum culling
//!
//! Every entity gets a bounding sphere the first time it is tested. The
//! radius is derived from the transform seen on that first test and cached
//! until [`VisibilityCuller::invalidate_entity_bounds`] or
//! [`VisibilityCuller::clear_culling_data`] resets it.
//!
//! The test fails open: without a frustum, or for an invalid entity id, the
//! entity is reported visible so that content is never hidden by accident.

use std::collections::HashMap;

use crate::core::config::InvariantPolicy;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::primitives::frustum::Frustum;

/// Half the diagonal of a unit cube, `sqrt(3) / 2`
pub const BOUNDING_RADIUS_FACTOR: f32 = 0.866;

/// Cached culling state of one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityCullingRecord {
    /// Cached bounding-sphere radius; 0 means "not computed yet"
    pub bounding_radius: f32,
    /// Result of the most recent test
    pub was_visible: bool,
}

impl Default for EntityCullingRecord {
    fn default() -> Self {
        Self {
            bounding_radius: 0.0,
            was_visible: true,
        }
    }
}

/// Bounding-sphere cache plus per-frame visibility counters
#[derive(Debug)]
pub struct VisibilityCuller {
    records: HashMap<i32, EntityCullingRecord>,
    total: u32,
    visible: u32,
    policy: InvariantPolicy,
}

impl VisibilityCuller {
    /// Create an empty culler
    pub fn new(policy: InvariantPolicy) -> Self {
        Self {
            records: HashMap::new(),
            total: 0,
            visible: 0,
            policy,
        }
    }

    /// Test one entity against the frustum
    ///
    /// The cached radius is `max_axis_scale * 0.866` of the first transform
    /// seen, and the test radius multiplies it by the current transform's
    /// max axis scale again. Only tests that reach the frustum update the
    /// counters.
    ///
    /// # Arguments
    /// * `entity_id` - Non-negative entity id
    /// * `transform` - World transform; its translation is the sphere center
    /// * `frustum` - Active frustum, `None` outside a camera scene
    pub fn is_visible(&mut self, entity_id: i32, transform: &Mat4, frustum: Option<&Frustum>) -> bool {
        let Some(frustum) = frustum else {
            self.policy.report("Visibility test without an active camera frustum");
            return true;
        };
        if entity_id < 0 {
            self.policy.report(&format!("Visibility test for invalid entity id {}", entity_id));
            return true;
        }

        let max_scale = transform.max_axis_scale();
        let record = self.records.entry(entity_id).or_default();
        if record.bounding_radius == 0.0 {
            record.bounding_radius = max_scale * BOUNDING_RADIUS_FACTOR;
        }

        let radius = record.bounding_radius * max_scale;
        let visible = frustum.intersects_sphere(&transform.translation_part(), radius);

        record.was_visible = visible;
        self.total += 1;
        if visible {
            self.visible += 1;
        }
        visible
    }

    /// Forget an entity's cached radius so the next test recomputes it
    pub fn invalidate_entity_bounds(&mut self, entity_id: i32) {
        if let Some(record) = self.records.get_mut(&entity_id) {
            record.bounding_radius = 0.0;
        }
    }

    /// Drop every cached record
    pub fn clear_culling_data(&mut self) {
        self.records.clear();
    }

    /// Zero the per-frame counters
    pub fn reset_counters(&mut self) {
        self.total = 0;
        self.visible = 0;
    }

    /// Cached record of an entity
    pub fn record(&self, entity_id: i32) -> Option<&EntityCullingRecord> {
        self.records.get(&entity_id)
    }

    /// Number of entities with a cached record
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Entities tested since the last counter reset
    pub fn total_count(&self) -> u32 {
        self.total
    }

    /// Entities that passed since the last counter reset
    pub fn visible_count(&self) -> u32 {
        self.visible
    }

    /// Entities rejected since the last counter reset
    pub fn culled_count(&self) -> u32 {
        self.total - self.visible
    }

    /// Percentage of tested entities that were culled
    pub fn culling_efficiency(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.culled_count() as f32 / self.total as f32 * 100.0
    }

    /// Active invariant policy
    pub fn policy(&self) -> InvariantPolicy {
        self.policy
    }
}
