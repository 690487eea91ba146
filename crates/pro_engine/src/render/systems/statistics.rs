//! Per-frame render statistics

/// Counters accumulated during a frame
///
/// `mesh_count`, `visible_mesh_count` and `culled_mesh_count` are written
/// once at `end_scene` from the culler's counters; everything else
/// accumulates draw by draw until `reset_stats`. Accumulation saturates, so a
/// renderer that never resets pins counters at their maximum instead of
/// wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    /// Every draw call issued, including the line flush
    pub draw_calls: u32,
    /// Entities that went through the cull test
    pub mesh_count: u32,
    /// Entities that passed the cull test
    pub visible_mesh_count: u32,
    /// Entities rejected by the cull test
    pub culled_mesh_count: u32,
    /// Vertices submitted by triangle draws, times instance count
    pub vertex_count: u64,
    /// Indices submitted by triangle draws, times instance count
    pub index_count: u64,
    /// Instanced draw calls
    pub instanced_draw_calls: u32,
    /// Non-instanced triangle draw calls
    pub individual_draw_calls: u32,
    /// Instances drawn by instanced calls
    pub total_instances: u32,
    /// Objects drawn through the instancing path
    pub instanced_objects: u32,
    /// Objects drawn one call at a time
    pub individual_objects: u32,
    /// Debug line vertices flushed
    pub line_vertex_count: u32,
}

impl FrameStatistics {
    /// Percentage of tested entities that were culled
    pub fn culling_efficiency(&self) -> f32 {
        if self.mesh_count == 0 {
            return 0.0;
        }
        self.culled_mesh_count as f32 / self.mesh_count as f32 * 100.0
    }

    /// Percentage of drawn objects that went through instancing
    pub fn instancing_efficiency(&self) -> f32 {
        let total = self.instanced_objects.saturating_add(self.individual_objects);
        if total == 0 {
            return 0.0;
        }
        self.instanced_objects as f32 / total as f32 * 100.0
    }

    /// Average objects per triangle draw call
    pub fn objects_per_draw_call(&self) -> f32 {
        let calls = self.instanced_draw_calls.saturating_add(self.individual_draw_calls);
        if calls == 0 {
            return 0.0;
        }
        self.instanced_objects.saturating_add(self.individual_objects) as f32 / calls as f32
    }
}
