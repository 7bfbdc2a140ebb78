//! The Generalised Uniform Grid (GUG): an auto-resizing spatial hash that
//! underlies every nearest-neighbour query in the planner.
//!
//! A regular grid is laid over the configured AABB. Cells are keyed by
//! their integer coordinates and hold the list of elements currently
//! registered in them (see [`CellCoord`]). When the average occupancy
//! exceeds `max_density`, the grid rebuilds itself with more, smaller
//! cells and reinserts everything — elements keep their [`ElementId`]
//! across a rehash, only the internal cell lists move.

mod cell;
mod element;
mod error;

pub use cell::CellCoord;
pub use element::ElementId;
pub use error::GugError;

use std::collections::HashMap;

use fermat_math::CVec;

/// Construction parameters, mirroring the reference's `ferGUGParamsInit`.
#[derive(Debug, Clone)]
pub struct GugParams {
    pub dim: usize,
    /// `2*dim`-length AABB: `[lo0, hi0, lo1, hi1, ...]`.
    pub aabb: Vec<f64>,
    pub initial_cells: usize,
    pub max_density: f64,
    pub expand_rate: f64,
    pub approx: bool,
}

impl GugParams {
    pub fn new(dim: usize, aabb: Vec<f64>) -> GugParams {
        GugParams {
            dim,
            aabb,
            initial_cells: 10_000,
            max_density: 1.0,
            expand_rate: 2.0,
            approx: false,
        }
    }
}

struct Slot<T> {
    generation: u32,
    pos: CVec,
    /// `None` marks a freed slot sitting in `free_list`.
    payload: Option<T>,
    cell: CellCoord,
    /// Index of this element within `cells[cell]`, kept in sync so removal
    /// can `swap_remove` in O(1) instead of scanning the cell's list.
    index_in_cell: usize,
}

/// An auto-resizing spatial hash over `ℝ^d`. See the module docs.
pub struct Gug<T> {
    dim: usize,
    aabb: Vec<f64>,
    edge: f64,
    grid_dim: Vec<i64>,
    max_density: f64,
    expand_rate: f64,
    approx: bool,

    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    cells: HashMap<CellCoord, Vec<ElementId>>,
    num_els: usize,
    next_expand: usize,
}

impl<T> Gug<T> {
    pub fn new(params: GugParams) -> Result<Gug<T>, GugError> {
        if params.dim == 0 || params.aabb.len() != 2 * params.dim {
            return Err(GugError::InvalidParameter("aabb length must be 2*dim"));
        }
        for i in 0..params.dim {
            if params.aabb[2 * i] >= params.aabb[2 * i + 1] {
                return Err(GugError::InvalidParameter("aabb is inverted or empty on some axis"));
            }
        }
        if params.initial_cells == 0 {
            return Err(GugError::InvalidParameter("initial_cells must be positive"));
        }

        let mut gug = Gug {
            dim: params.dim,
            aabb: params.aabb,
            edge: 1.0,
            grid_dim: vec![1; params.dim],
            max_density: params.max_density,
            expand_rate: params.expand_rate,
            approx: params.approx,
            slots: Vec::new(),
            free_list: Vec::new(),
            cells: HashMap::new(),
            num_els: 0,
            next_expand: 0,
        };
        gug.rebuild_cell_shape(params.initial_cells);
        Ok(gug)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.num_els
    }

    pub fn is_empty(&self) -> bool {
        self.num_els == 0
    }

    pub fn get(&self, id: ElementId) -> Option<&T> {
        self.slots.get(id.index as usize).and_then(|slot| {
            (slot.generation == id.generation).then(|| slot.payload.as_ref()).flatten()
        })
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut T> {
        self.slots.get_mut(id.index as usize).and_then(|slot| {
            (slot.generation == id.generation).then(|| slot.payload.as_mut()).flatten()
        })
    }

    pub fn position(&self, id: ElementId) -> Option<&CVec> {
        self.slots.get(id.index as usize).and_then(|slot| {
            (slot.generation == id.generation && slot.payload.is_some()).then_some(&slot.pos)
        })
    }

    /// Inserts an element at `pos`. `O(1)` amortised; may trigger a rehash
    /// if the resulting density exceeds `max_density`.
    pub fn add(&mut self, pos: CVec, payload: T) -> Result<ElementId, GugError> {
        if pos.dim() != self.dim {
            return Err(GugError::InvalidParameter("position dimension does not match grid dimension"));
        }

        let cell = self.cell_of(&pos);
        let id = self.alloc_slot(pos, payload, cell.clone());
        self.place_in_cell(id, cell);

        self.num_els += 1;
        if self.num_els > self.next_expand {
            self.expand();
        }
        Ok(id)
    }

    /// Removes an element. `O(1)`.
    pub fn remove(&mut self, id: ElementId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.payload.is_none() {
            return None;
        }

        let cell = slot.cell.clone();
        let index_in_cell = slot.index_in_cell;
        let payload = slot.payload.take();
        slot.generation = slot.generation.wrapping_add(1);

        self.remove_from_cell(&cell, index_in_cell);
        self.free_list.push(id.index);
        self.num_els -= 1;
        payload
    }

    /// Re-inserts an element at a new position (`remove` followed by
    /// `add`, but preserving the element's id).
    pub fn update(&mut self, id: ElementId, new_pos: CVec) -> Result<(), GugError> {
        if new_pos.dim() != self.dim {
            return Err(GugError::InvalidParameter("position dimension does not match grid dimension"));
        }
        let slot = self.slots.get_mut(id.index as usize).ok_or(GugError::InvalidParameter("unknown element"))?;
        if slot.generation != id.generation || slot.payload.is_none() {
            return Err(GugError::InvalidParameter("unknown element"));
        }

        let old_cell = slot.cell.clone();
        let old_index_in_cell = slot.index_in_cell;
        let new_cell = self.cell_of(&new_pos);

        if new_cell == old_cell {
            let slot = &mut self.slots[id.index as usize];
            slot.pos = new_pos;
            return Ok(());
        }

        self.remove_from_cell(&old_cell, old_index_in_cell);
        let slot = &mut self.slots[id.index as usize];
        slot.pos = new_pos;
        slot.cell = new_cell.clone();
        self.place_in_cell(id, new_cell);
        Ok(())
    }

    /// Returns up to `k` nearest registered elements to `q`, sorted
    /// ascending by squared distance. Never fails; may return fewer than
    /// `k` if fewer are registered.
    pub fn nearest(&self, q: &CVec, k: usize) -> Vec<(ElementId, f64)> {
        self.nearest_with_mode(q, k, self.approx)
    }

    /// As [`Gug::nearest`], but always stops as soon as the result buffer
    /// fills, without verifying every closer cell has been scanned.
    pub fn nearest_approx(&self, q: &CVec, k: usize) -> Vec<(ElementId, f64)> {
        self.nearest_with_mode(q, k, true)
    }

    fn nearest_with_mode(&self, q: &CVec, k: usize, approx: bool) -> Vec<(ElementId, f64)> {
        if k == 0 || self.num_els == 0 {
            return Vec::new();
        }

        let mut found: Vec<(ElementId, f64)> = Vec::with_capacity(k.min(16));
        let center = self.grid_coords(q);

        self.scan_cell(&center, q, k, &mut found);

        let mut border = self.init_border(q);
        let mut radius: i64 = 1;
        loop {
            let full = found.len() == k;
            if full {
                let worst = found[found.len() - 1].1;
                if approx || worst < border * border {
                    break;
                }
            }

            let touched = self.scan_shell(&center, radius, q, k, &mut found);
            if !touched {
                break;
            }

            border += self.edge;
            radius += 1;
        }

        found
    }

    fn scan_cell(&self, coord: &CellCoord, q: &CVec, k: usize, found: &mut Vec<(ElementId, f64)>) {
        if let Some(els) = self.cells.get(coord) {
            for &id in els {
                if let Some(pos) = self.position(id) {
                    let d2 = q.dist2(pos);
                    insert_sorted(found, id, d2, k);
                }
            }
        }
    }

    /// Visits every cell whose Chebyshev distance from `center` is exactly
    /// `radius`. Returns `false` once `radius` has pushed entirely outside
    /// the grid on every axis (nothing left to scan, ever).
    fn scan_shell(&self, center: &CellCoord, radius: i64, q: &CVec, k: usize, found: &mut Vec<(ElementId, f64)>) -> bool {
        let mut any_in_range = false;
        let mut touched = false;

        if self.dim == 2 {
            let cx = center.axis(0);
            let cy = center.axis(1);
            let dimx = self.grid_dim[0];
            let dimy = self.grid_dim[1];

            let y_from = (cy - radius).max(0);
            let y_to = (cy + radius).min(dimy - 1);

            for &x in &[cx - radius, cx + radius] {
                if x < 0 || x >= dimx {
                    continue;
                }
                any_in_range = true;
                for y in y_from..=y_to {
                    touched = true;
                    self.scan_cell(&CellCoord::new(&[x, y]), q, k, found);
                }
            }

            let x_from = (cx - radius + 1).max(0);
            let x_to = (cx + radius - 1).min(dimx - 1);
            for &y in &[cy - radius, cy + radius] {
                if y < 0 || y >= dimy {
                    continue;
                }
                any_in_range = true;
                for x in x_from..=x_to {
                    touched = true;
                    self.scan_cell(&CellCoord::new(&[x, y]), q, k, found);
                }
            }
        } else {
            for axis in 0..self.dim {
                for &delta in &[-radius, radius] {
                    let c = center.axis(axis) + delta;
                    if c < 0 || c >= self.grid_dim[axis] {
                        continue;
                    }
                    any_in_range = true;
                    let mut pos = center.clone();
                    pos.set_axis(axis, c);
                    self.scan_fixed_axis(&mut pos, axis, radius, center, q, k, found, &mut touched);
                }
            }
        }

        any_in_range || touched
    }

    /// Recursively enumerates every cell on the current shell that has its
    /// `fix`-th axis already pinned, varying every other axis within
    /// `[-radius, radius]` of `center` (clamped to the grid).
    fn scan_fixed_axis(
        &self,
        pos: &mut CellCoord,
        fix: usize,
        radius: i64,
        center: &CellCoord,
        q: &CVec,
        k: usize,
        found: &mut Vec<(ElementId, f64)>,
        touched: &mut bool,
    ) {
        self.scan_fixed_axis_rec(pos, 0, fix, radius, center, q, k, found, touched);
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_fixed_axis_rec(
        &self,
        pos: &mut CellCoord,
        axis: usize,
        fix: usize,
        radius: i64,
        center: &CellCoord,
        q: &CVec,
        k: usize,
        found: &mut Vec<(ElementId, f64)>,
        touched: &mut bool,
    ) {
        if axis == self.dim {
            *touched = true;
            self.scan_cell(pos, q, k, found);
            return;
        }
        if axis == fix {
            self.scan_fixed_axis_rec(pos, axis + 1, fix, radius, center, q, k, found, touched);
            return;
        }

        let (from, to) = if axis < fix {
            (
                (center.axis(axis) - radius + 1).max(0),
                (center.axis(axis) + radius - 1).min(self.grid_dim[axis] - 1),
            )
        } else {
            (
                (center.axis(axis) - radius).max(0),
                (center.axis(axis) + radius).min(self.grid_dim[axis] - 1),
            )
        };

        for v in from..=to {
            pos.set_axis(axis, v);
            self.scan_fixed_axis_rec(pos, axis + 1, fix, radius, center, q, k, found, touched);
        }
    }

    fn init_border(&self, q: &CVec) -> f64 {
        let mut border = f64::MAX;
        for i in 0..self.dim {
            let local = q.get(i) - self.aabb[2 * i];
            let cell_index = (local / self.edge).floor();
            let min = cell_index * self.edge;
            let max = min + self.edge;

            border = border.min(local - min).min(max - local);
        }
        border.max(0.0)
    }

    fn grid_coords(&self, p: &CVec) -> CellCoord {
        let mut coords = vec![0i64; self.dim];
        for i in 0..self.dim {
            let local = p.get(i) - self.aabb[2 * i];
            let c = (local / self.edge).floor() as i64;
            coords[i] = c.clamp(0, self.grid_dim[i] - 1);
        }
        CellCoord::new(&coords)
    }

    fn cell_of(&self, p: &CVec) -> CellCoord {
        self.grid_coords(p)
    }

    fn alloc_slot(&mut self, pos: CVec, payload: T, cell: CellCoord) -> ElementId {
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.pos = pos;
            slot.payload = Some(payload);
            slot.cell = cell;
            slot.index_in_cell = 0;
            ElementId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                pos,
                payload: Some(payload),
                cell,
                index_in_cell: 0,
            });
            ElementId { index, generation: 0 }
        }
    }

    fn place_in_cell(&mut self, id: ElementId, cell: CellCoord) {
        let list = self.cells.entry(cell).or_default();
        self.slots[id.index as usize].index_in_cell = list.len();
        list.push(id);
    }

    fn remove_from_cell(&mut self, cell: &CellCoord, index_in_cell: usize) {
        if let Some(list) = self.cells.get_mut(cell) {
            list.swap_remove(index_in_cell);
            if let Some(&moved) = list.get(index_in_cell) {
                self.slots[moved.index as usize].index_in_cell = index_in_cell;
            }
            if list.is_empty() {
                self.cells.remove(cell);
            }
        }
    }

    /// Rebuilds the grid with `⌈expand_rate * current_cell_count⌉` cells
    /// and reinserts every live element by spatial position. Element ids
    /// are preserved; only the cell lists move.
    fn expand(&mut self) {
        let current_cells: usize = self.grid_dim.iter().map(|&d| d as usize).product();
        let mut new_cells = ((self.expand_rate * current_cells as f64).ceil()) as usize;
        if new_cells <= current_cells {
            new_cells = current_cells * 2;
        }
        log::debug!("GUG rehash: {current_cells} -> {new_cells} cells ({} elements)", self.num_els);

        self.rebuild_cell_shape(new_cells.max(1));

        self.cells.clear();
        for index in 0..self.slots.len() {
            if self.slots[index].payload.is_none() {
                continue;
            }
            let id = ElementId { index: index as u32, generation: self.slots[index].generation };
            let cell = self.grid_coords(&self.slots[index].pos.clone());
            self.slots[index].cell = cell.clone();
            self.place_in_cell(id, cell);
        }
    }

    fn rebuild_cell_shape(&mut self, num_cells: usize) {
        let mut volume = 1.0;
        let mut extents = vec![0.0; self.dim];
        for i in 0..self.dim {
            extents[i] = (self.aabb[2 * i + 1] - self.aabb[2 * i]).abs();
            volume *= extents[i];
        }
        volume /= num_cells as f64;

        self.edge = volume.powf(1.0 / self.dim as f64);
        for i in 0..self.dim {
            self.grid_dim[i] = (extents[i] / self.edge) as i64 + 1;
        }

        let total: usize = self.grid_dim.iter().map(|&d| d as usize).product();
        self.next_expand = if self.max_density <= 0.0 {
            usize::MAX
        } else {
            (total as f64 * self.max_density) as usize
        };
    }
}

fn insert_sorted(found: &mut Vec<(ElementId, f64)>, id: ElementId, dist2: f64, k: usize) {
    if found.len() < k {
        found.push((id, dist2));
        bubble_up(found);
    } else if dist2 < found[found.len() - 1].1 {
        let last = found.len() - 1;
        found[last] = (id, dist2);
        bubble_up(found);
    }
}

fn bubble_up(found: &mut [(ElementId, f64)]) {
    for i in (1..found.len()).rev() {
        if found[i].1 < found[i - 1].1 {
            found.swap(i, i - 1);
        } else {
            break;
        }
    }
}
