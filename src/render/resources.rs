use std::collections::HashMap;

/// Kind of graphics allocation tracked by [`GpuResources`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Vertex and index buffers uploaded for a mesh.
    Geometry,
    /// Per-mesh shading parameters.
    Material,
    /// Render targets and sampled images.
    Texture,
}

/// Opaque handle to one live allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle {
    id: u64,
    kind: ResourceKind,
}

impl ResourceHandle {
    pub fn kind(self) -> ResourceKind {
        self.kind
    }
}

/// Point-in-time counters for the registry.
///
/// `live_*` fields go up on allocate and down on release; `alloc_*` and `released` only grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub live_geometries: usize,
    pub live_materials: usize,
    pub live_textures: usize,
    pub live_bytes: usize,
    pub alloc_count: u64,
    pub alloc_bytes: u64,
    pub released: u64,
}

impl ResourceStats {
    pub fn live_total(&self) -> usize {
        self.live_geometries + self.live_materials + self.live_textures
    }
}

/// Registry of graphics-memory allocations owned by a renderer.
///
/// Every allocation is explicit and every release is explicit, so a leak shows up as a live count
/// that does not return to its baseline.
#[derive(Debug, Default)]
pub struct GpuResources {
    next_id: u64,
    live: HashMap<u64, (ResourceKind, usize)>,
    stats: ResourceStats,
}

impl GpuResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.live.contains_key(&handle.id)
    }

    pub fn allocate(&mut self, kind: ResourceKind, bytes: usize) -> ResourceHandle {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.live.insert(id, (kind, bytes));

        *self.live_count_mut(kind) += 1;
        self.stats.live_bytes = self.stats.live_bytes.saturating_add(bytes);
        self.stats.alloc_count = self.stats.alloc_count.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(bytes as u64);
        ResourceHandle { id, kind }
    }

    /// Release an allocation. Returns `false` when the handle was already released.
    pub fn release(&mut self, handle: ResourceHandle) -> bool {
        let Some((kind, bytes)) = self.live.remove(&handle.id) else {
            return false;
        };
        let count = self.live_count_mut(kind);
        *count = count.saturating_sub(1);
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(bytes);
        self.stats.released = self.stats.released.saturating_add(1);
        true
    }

    pub fn release_all(&mut self, handles: impl IntoIterator<Item = ResourceHandle>) -> usize {
        handles.into_iter().filter(|h| self.release(*h)).count()
    }

    fn live_count_mut(&mut self, kind: ResourceKind) -> &mut usize {
        match kind {
            ResourceKind::Geometry => &mut self.stats.live_geometries,
            ResourceKind::Material => &mut self.stats.live_materials,
            ResourceKind::Texture => &mut self.stats.live_textures,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/resources.rs"]
mod tests;
