//! The collision context: a set of rigid-body "geoms", each a composite
//! of one or more primitive shapes under local offsets, queried pairwise
//! (or all-pairs, broad-phased through [`Sap`]) for overlap and
//! separation contacts.

use fermat_math::{Matrix3, Vector3};

use crate::dispatch::{self, Contact};
use crate::error::CollisionError;
use crate::obb::{BuildFlags, ObbTree};
use crate::sap::Sap;
use crate::shapes::{Pose, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeomId {
    index: u32,
    generation: u32,
}

/// Construction parameters for a [`CdContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdParams {
    pub build_flags: BuildFlags,
    /// Whether `collide_all` broad-phases through [`Sap`] before the
    /// precise pairwise test, or just tries every pair directly.
    pub use_sap: bool,
    /// Hash bucket count for the SAP broad phase; ignored when `use_sap`
    /// is `false`.
    pub sap_size: usize,
    /// Caps how many contacts `geom_separate` collects per pair.
    pub max_contacts: usize,
}

impl CdParams {
    pub fn new() -> CdParams {
        CdParams { build_flags: BuildFlags::default(), use_sap: true, sap_size: 1023, max_contacts: 20 }
    }
}

impl Default for CdParams {
    fn default() -> CdParams {
        CdParams::new()
    }
}

struct GeomEntry {
    /// Shapes as added, each with a pose local to the geom's own origin.
    local_shapes: Vec<(Shape, Pose)>,
    /// Current world placement of the geom's origin.
    pose: Pose,
    dirty: bool,
    /// World-space `(shape, pose)` per leaf, rebuilt whenever `dirty`.
    world_leaves: Vec<(Shape, Pose)>,
    tree: ObbTree,
}

impl GeomEntry {
    fn empty() -> GeomEntry {
        GeomEntry {
            local_shapes: Vec::new(),
            pose: Pose::identity(),
            dirty: true,
            world_leaves: Vec::new(),
            tree: ObbTree::build(&[]),
        }
    }
}

/// A collision world: owns every geom and the broad-phase structure used
/// to cull pairs before running the precise dispatch table on them.
///
/// Generations live in a slot-indexed array independent of `geoms` so a
/// freed-then-reused slot's generation survives the slot being `None` in
/// between; storing it inside `GeomEntry` would lose it at the moment of
/// deletion, when the entry itself is dropped.
pub struct CdContext {
    geoms: Vec<Option<GeomEntry>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,
    params: CdParams,
}

impl CdContext {
    pub fn new(params: CdParams) -> CdContext {
        CdContext { geoms: Vec::new(), generations: Vec::new(), free_list: Vec::new(), params }
    }

    /// Replaces the [`BuildFlags`] used by subsequent `build()` calls;
    /// geoms already built keep their existing tree until next marked
    /// dirty.
    pub fn set_build_flags(&mut self, flags: BuildFlags) {
        self.params.build_flags = flags;
    }

    pub fn geom_new(&mut self) -> GeomId {
        if let Some(index) = self.free_list.pop() {
            self.geoms[index as usize] = Some(GeomEntry::empty());
            return GeomId { index, generation: self.generations[index as usize] };
        }
        let index = self.geoms.len() as u32;
        self.geoms.push(Some(GeomEntry::empty()));
        self.generations.push(0);
        GeomId { index, generation: 0 }
    }

    pub fn geom_del(&mut self, id: GeomId) -> Result<(), CollisionError> {
        self.entry_mut(id)?;
        self.generations[id.index as usize] = self.generations[id.index as usize].wrapping_add(1);
        self.geoms[id.index as usize] = None;
        self.free_list.push(id.index);
        Ok(())
    }

    pub fn geom_add_shape(&mut self, id: GeomId, shape: Shape, local_pose: Pose) -> Result<(), CollisionError> {
        let entry = self.entry_mut(id)?;
        entry.local_shapes.push((shape, local_pose));
        entry.dirty = true;
        Ok(())
    }

    pub fn geom_set_tr(&mut self, id: GeomId, tr: Vector3) -> Result<(), CollisionError> {
        let entry = self.entry_mut(id)?;
        entry.pose.tr = tr;
        entry.dirty = true;
        Ok(())
    }

    pub fn geom_set_rot(&mut self, id: GeomId, rot: Matrix3) -> Result<(), CollisionError> {
        let entry = self.entry_mut(id)?;
        entry.pose.rot = rot;
        entry.dirty = true;
        Ok(())
    }

    pub fn geom_pose(&self, id: GeomId) -> Result<Pose, CollisionError> {
        Ok(self.entry(id)?.pose)
    }

    /// Rebuilds a geom's world-space OBB tree if it was marked dirty by a
    /// prior `add_shape`/`set_tr`/`set_rot` call. A no-op otherwise.
    pub fn build(&mut self, id: GeomId) -> Result<(), CollisionError> {
        let build_flags = self.params.build_flags;
        let entry = self.entry_mut(id)?;
        if !entry.dirty {
            return Ok(());
        }
        entry.world_leaves = entry
            .local_shapes
            .iter()
            .map(|(shape, local_pose)| (shape.clone(), entry.pose.compose(local_pose)))
            .collect();
        entry.tree = ObbTree::build_with_flags(&entry.world_leaves, build_flags);
        entry.dirty = false;
        Ok(())
    }

    /// World-space AABB of a geom's root OBB, for broad-phase culling.
    /// Returns `None` for an empty geom.
    pub fn geom_aabb(&mut self, id: GeomId) -> Result<Option<(Vector3, Vector3)>, CollisionError> {
        self.build(id)?;
        let entry = self.entry(id)?;
        Ok(entry.tree.root_obb().map(obb_aabb))
    }

    pub fn geom_collide(&mut self, a: GeomId, b: GeomId) -> Result<bool, CollisionError> {
        self.build(a)?;
        self.build(b)?;
        let ea = self.entry(a)?;
        let eb = self.entry(b)?;

        let mut hit = false;
        ObbTree::traverse_pairs(&ea.tree, &eb.tree, &mut |ia, ib| {
            let (sa, pa) = &ea.world_leaves[ia];
            let (sb, pb) = &eb.world_leaves[ib];
            if dispatch::collide(sa, pa, sb, pb) {
                hit = true;
                false
            } else {
                true
            }
        });
        Ok(hit)
    }

    /// Collects up to `max_contacts` separation contacts between two
    /// geoms' overlapping leaf pairs.
    pub fn geom_separate(&mut self, a: GeomId, b: GeomId) -> Result<Vec<Contact>, CollisionError> {
        self.build(a)?;
        self.build(b)?;
        let max_contacts = self.params.max_contacts;
        let ea = self.entry(a)?;
        let eb = self.entry(b)?;

        let mut contacts = Vec::new();
        ObbTree::traverse_pairs(&ea.tree, &eb.tree, &mut |ia, ib| {
            if contacts.len() >= max_contacts {
                return false;
            }
            let (sa, pa) = &ea.world_leaves[ia];
            let (sb, pb) = &eb.world_leaves[ib];
            if let Some(c) = dispatch::separate(sa, pa, sb, pb) {
                contacts.push(c);
            }
            contacts.len() < max_contacts
        });
        Ok(contacts)
    }

    /// Finds every colliding pair among all live geoms. Broad-phases
    /// through [`Sap`] when `use_sap` is set; otherwise tests every pair
    /// directly.
    pub fn collide_all(&mut self) -> Result<Vec<(GeomId, GeomId)>, CollisionError> {
        let ids: Vec<GeomId> = self.live_ids();

        if !self.params.use_sap {
            let mut hits = Vec::new();
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    if self.geom_collide(ids[i], ids[j])? {
                        hits.push((ids[i], ids[j]));
                    }
                }
            }
            return Ok(hits);
        }

        let sap = Sap::new(self.params.sap_size);
        let mut aabbs = Vec::with_capacity(ids.len());
        for &id in &ids {
            aabbs.push(self.geom_aabb(id)?.unwrap_or((Vector3::zero(), Vector3::zero())));
        }

        let mut hits = Vec::new();
        for (i, j) in sap.candidate_pairs(&aabbs) {
            if self.geom_collide(ids[i], ids[j])? {
                hits.push((ids[i], ids[j]));
            }
        }
        Ok(hits)
    }

    fn live_ids(&self) -> Vec<GeomId> {
        self.geoms
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref().map(|_| GeomId { index: i as u32, generation: self.generations[i] })
            })
            .collect()
    }

    fn entry(&self, id: GeomId) -> Result<&GeomEntry, CollisionError> {
        if self.generations.get(id.index as usize) != Some(&id.generation) {
            return Err(CollisionError::UnknownGeom);
        }
        self.geoms.get(id.index as usize).and_then(|s| s.as_ref()).ok_or(CollisionError::UnknownGeom)
    }

    fn entry_mut(&mut self, id: GeomId) -> Result<&mut GeomEntry, CollisionError> {
        if self.generations.get(id.index as usize) != Some(&id.generation) {
            return Err(CollisionError::UnknownGeom);
        }
        self.geoms.get_mut(id.index as usize).and_then(|s| s.as_mut()).ok_or(CollisionError::UnknownGeom)
    }
}

impl Default for CdContext {
    fn default() -> CdContext {
        CdContext::new(CdParams::default())
    }
}

fn obb_aabb(obb: &crate::sat::Obb) -> (Vector3, Vector3) {
    let mut min = obb.center;
    let mut max = obb.center;
    for corner in obb.corners() {
        min = min.min(corner);
        max = max.max(corner);
    }
    (min, max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn two_overlapping_spheres_collide() {
        let mut cd = CdContext::default();
        let a = cd.geom_new();
        let b = cd.geom_new();
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_set_tr(b, Vector3::new(1.5, 0.0, 0.0)).unwrap();

        assert!(cd.geom_collide(a, b).unwrap());
        let contacts = cd.geom_separate(a, b).unwrap();
        assert_eq!(contacts.len(), 1);
        assert!((contacts[0].depth - 0.5).abs() < 1e-9);
    }

    #[test]
    fn moving_geom_apart_clears_collision() {
        let mut cd = CdContext::default();
        let a = cd.geom_new();
        let b = cd.geom_new();
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_set_tr(b, Vector3::new(1.5, 0.0, 0.0)).unwrap();
        assert!(cd.geom_collide(a, b).unwrap());

        cd.geom_set_tr(b, Vector3::new(10.0, 0.0, 0.0)).unwrap();
        assert!(!cd.geom_collide(a, b).unwrap());
    }

    #[test]
    fn deleted_geom_is_rejected() {
        let mut cd = CdContext::default();
        let a = cd.geom_new();
        cd.geom_del(a).unwrap();
        assert!(cd.geom_set_tr(a, Vector3::zero()).is_err());
    }

    #[test]
    fn collide_all_finds_the_one_overlapping_pair() {
        let mut cd = CdContext::default();
        let a = cd.geom_new();
        let b = cd.geom_new();
        let c = cd.geom_new();
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_add_shape(c, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_set_tr(b, Vector3::new(1.5, 0.0, 0.0)).unwrap();
        cd.geom_set_tr(c, Vector3::new(100.0, 0.0, 0.0)).unwrap();

        let hits = cd.collide_all().unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn disabling_sap_still_finds_the_overlapping_pair() {
        let mut params = CdParams::default();
        params.use_sap = false;
        let mut cd = CdContext::new(params);
        let a = cd.geom_new();
        let b = cd.geom_new();
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::identity()).unwrap();
        cd.geom_set_tr(b, Vector3::new(1.5, 0.0, 0.0)).unwrap();

        let hits = cd.collide_all().unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn max_contacts_caps_the_returned_contact_count() {
        let mut params = CdParams::default();
        params.max_contacts = 1;
        let mut cd = CdContext::new(params);
        let a = cd.geom_new();
        let b = cd.geom_new();
        // Two overlapping sphere leaves per geom so more than one contact
        // would be produced without the cap.
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::new(Matrix3::identity(), Vector3::new(0.0, 0.0, 0.0))).unwrap();
        cd.geom_add_shape(a, Shape::sphere(1.0).unwrap(), Pose::new(Matrix3::identity(), Vector3::new(0.0, 3.0, 0.0))).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::new(Matrix3::identity(), Vector3::new(1.5, 0.0, 0.0))).unwrap();
        cd.geom_add_shape(b, Shape::sphere(1.0).unwrap(), Pose::new(Matrix3::identity(), Vector3::new(1.5, 3.0, 0.0))).unwrap();

        let contacts = cd.geom_separate(a, b).unwrap();
        assert_eq!(contacts.len(), 1);
    }
}
