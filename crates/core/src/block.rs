//! Block shape catalog: a set of bricks (tiles) plus a list of shapes that
//! place those bricks on a cell grid.
//!
//! Bricks and shapes are addressed by small integer ids. Removing one frees
//! its id for reuse, so ids stay stable while the dense iteration arrays
//! stay compact. Each shape keeps an occupancy index from packed cell
//! coordinates to brick id, plus cached bounds and per-direction contact
//! maps that are recomputed after every structural mutation.

use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

use blockfall_types::{pack_xy, unpack_xy, Direction, Point, Size, Tile};

/// Identifies a brick within one [`Block`]. Stable across mutations until
/// the brick is removed.
pub type BrickId = u32;

/// Identifies a shape within one [`Block`].
pub type ShapeId = u32;

/// One free cell adjacent to a shape in a given direction.
///
/// `pos` is relative to the shape's coordinate space, `brick` is the brick
/// whose neighbor the cell is. Ordered by position then brick id so contact
/// lists have a deterministic order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Contact {
    pub pos: Point,
    pub brick: BrickId,
}

/// Brick id remapping produced by [`Block::fuse`].
#[derive(Debug, Clone, Default)]
pub struct BlockFusion {
    /// Old brick id in the first block to brick id in the fused block.
    pub first: FxHashMap<BrickId, BrickId>,
    /// Old brick id in the second block to brick id in the fused block.
    pub second: FxHashMap<BrickId, BrickId>,
    /// Offset to add to the first block's position so the fused block
    /// covers the first block's bricks at their former absolute cells.
    pub first_delta: Point,
}

/// Per-brick change for [`Block::shape_modify_bricks`]: brick id, new
/// position, requested visibility.
pub type BrickChange = (BrickId, Point, bool);

/// Per-brick layout used when defining a shape: visibility plus position.
pub type BrickDef = (bool, i32, i32);

#[derive(Debug, Clone, Default)]
struct ShapeData {
    /// Indexed by brick id (arena capacity, not dense).
    pos: Vec<Point>,
    visible: Vec<bool>,
    /// Packed position to brick id, visible bricks only.
    occupied: FxHashMap<i64, BrickId>,
    min_pos: Point,
    max_pos: Point,
    contacts: [FxHashMap<i64, BrickId>; 4],
}

/// A brick arena plus an ordered list of shapes placing those bricks.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Dense list of live brick ids, arbitrary order.
    brick_ids: Vec<BrickId>,
    /// Brick id to index into `brick_ids`, `None` when freed.
    brick_index: Vec<Option<u32>>,
    free_brick_ids: Vec<BrickId>,
    /// Indexed by brick id. Never holds an empty tile for a live brick.
    tiles: Vec<Tile>,
    /// Live shape ids in insertion order.
    shape_order: Vec<ShapeId>,
    shape_live: Vec<bool>,
    free_shape_ids: Vec<ShapeId>,
    shapes: Vec<ShapeData>,
    max_width: i32,
    max_height: i32,
    widest: Option<ShapeId>,
    highest: Option<ShapeId>,
}

impl Block {
    /// Empty block: no bricks, no shapes.
    pub fn new() -> Block {
        Block::default()
    }

    /// Builds a block from explicit per-shape brick layouts.
    ///
    /// `shapes[s]` lists `(visible, x, y)` per brick id; bricks beyond the
    /// end of a list are invisible at the origin in that shape. When two
    /// bricks of a shape claim the same cell the first one stays visible
    /// and the later ones are silently hidden.
    pub fn from_shapes(tiles: &[Tile], shapes: &[Vec<BrickDef>]) -> Block {
        debug_assert!(!tiles.is_empty());
        debug_assert!(!shapes.is_empty());
        let mut b = Block::default();
        b.assign_bricks(tiles);
        let cap = b.tiles.len();
        for defs in shapes {
            let sid = b.alloc_shape();
            Self::fill_shape(&mut b.shapes[sid as usize], defs, cap);
            b.shape_order.push(sid);
            b.calc_shape_caches(sid);
        }
        b.calc_widest_highest();
        b
    }

    /// Builds a block whose four shapes are the given layout plus its three
    /// successive counterclockwise rotations within a `wh` x `wh` square.
    pub fn with_rotations(tiles: &[Tile], first: &[BrickDef], wh: i32) -> Block {
        debug_assert!(!tiles.is_empty());
        debug_assert!(wh > 0);
        let mut b = Block::default();
        b.assign_bricks(tiles);
        let cap = b.tiles.len();
        let s0 = b.alloc_shape();
        Self::fill_shape(&mut b.shapes[s0 as usize], first, cap);
        b.shape_order.push(s0);
        b.calc_shape_caches(s0);
        b.append_rotations(s0, wh);
        b.calc_widest_highest();
        b
    }

    /// Merges two blocks into a new one.
    ///
    /// Takes one shape of each; the second is offset by `rel` (its position
    /// relative to the first). Where both have a visible brick the first
    /// wins and the second's brick is kept invisible. The union is then
    /// centered by barycenter within a square whose side is the larger of
    /// the union's width and height, and three rotations are appended.
    ///
    /// Returns the fused block plus the brick id remapping and the position
    /// delta for the first block.
    pub fn fuse(
        first: &Block,
        first_shape: ShapeId,
        second: &Block,
        second_shape: ShapeId,
        rel: Point,
    ) -> (Block, BlockFusion) {
        debug_assert!(first.is_shape(first_shape));
        debug_assert!(second.is_shape(second_shape));
        let mut b = Block::default();
        let mut fusion = BlockFusion::default();
        let s0 = b.alloc_shape();
        b.shape_order.push(s0);

        // Sum of visible positions, for the barycenter correction below.
        let mut bary = Point::default();
        for (&key, &old) in &first.shapes[first_shape as usize].occupied {
            let p = unpack_xy(key);
            let bid = b.push_brick(first.tiles[old as usize]);
            let shape = &mut b.shapes[s0 as usize];
            shape.pos.push(p);
            shape.visible.push(true);
            shape.occupied.insert(key, bid);
            bary += p;
            fusion.first.insert(old, bid);
        }
        for (&key, &old) in &second.shapes[second_shape as usize].occupied {
            let p = unpack_xy(key) + rel;
            let bid = b.push_brick(second.tiles[old as usize]);
            let shape = &mut b.shapes[s0 as usize];
            let free = !shape.occupied.contains_key(&pack_xy(p.x, p.y));
            shape.pos.push(p);
            shape.visible.push(free);
            if free {
                shape.occupied.insert(pack_xy(p.x, p.y), bid);
                bary += p;
            }
            fusion.second.insert(old, bid);
        }
        b.calc_shape_caches(s0);

        let s0d = &b.shapes[s0 as usize];
        let tot_vis = s0d.occupied.len() as i32;
        debug_assert!(tot_vis > 0);
        let corr = (tot_vis - 1) / 2;
        let min = s0d.min_pos;
        let max = s0d.max_pos;
        let bx = (bary.x + corr) / tot_vis - min.x;
        let by = (bary.y + corr) / tot_vis - min.y;
        let res_w = max.x - min.x + 1;
        let res_h = max.y - min.y + 1;
        let wh = res_w.max(res_h);
        let free_w = wh - res_w;
        let free_h = wh - res_h;
        // Barycenter relative to the geometric center decides which side
        // gets the odd spare row or column.
        let dx = bx - (res_w - 1) / 2;
        let dy = by - (res_h - 1) / 2;
        let mut base_x = free_w / 2;
        let mut base_y = free_h / 2;
        if free_w - 2 * base_x > 0 && dx < 0 {
            base_x += 1;
        }
        if free_h - 2 * base_y > 0 && dy < 0 {
            base_y += 1;
        }
        let corr_x = base_x - min.x;
        let corr_y = base_y - min.y;
        {
            let shape = &mut b.shapes[s0 as usize];
            shape.occupied.clear();
            for bid in 0..shape.pos.len() {
                shape.pos[bid] += Point::new(corr_x, corr_y);
                if shape.visible[bid] {
                    let p = shape.pos[bid];
                    shape.occupied.insert(pack_xy(p.x, p.y), bid as BrickId);
                }
            }
        }
        b.calc_shape_caches(s0);
        b.append_rotations(s0, wh);
        b.calc_widest_highest();
        fusion.first_delta = Point::new(-corr_x, -corr_y);
        (b, fusion)
    }

    // ---- brick mutations ----

    /// Adds a brick to every shape at the given position.
    ///
    /// In shapes where the cell is already taken the brick is hidden
    /// instead. An empty block gets a first shape implicitly.
    pub fn brick_add(&mut self, tile: Tile, pos: Point, visible: bool) -> BrickId {
        if self.shape_order.is_empty() {
            self.shape_insert(None);
        }
        let bid = match self.free_brick_ids.pop() {
            Some(id) => {
                self.brick_index[id as usize] = Some(self.brick_ids.len() as u32);
                self.brick_ids.push(id);
                id
            }
            None => {
                let id = self.push_brick(Tile::SENTINEL);
                for i in 0..self.shape_order.len() {
                    let shape = &mut self.shapes[self.shape_order[i] as usize];
                    shape.pos.push(Point::default());
                    shape.visible.push(false);
                }
                id
            }
        };
        self.tiles[bid as usize] = tile.or_sentinel();
        for i in 0..self.shape_order.len() {
            let sid = self.shape_order[i];
            let shape = &mut self.shapes[sid as usize];
            shape.pos[bid as usize] = pos;
            let vis = visible && !shape.occupied.contains_key(&pack_xy(pos.x, pos.y));
            shape.visible[bid as usize] = vis;
            if vis {
                shape.occupied.insert(pack_xy(pos.x, pos.y), bid);
            }
        }
        for i in 0..self.shape_order.len() {
            self.calc_shape_caches(self.shape_order[i]);
        }
        self.calc_widest_highest();
        bid
    }

    /// Removes a brick from the arena and from every shape.
    /// Returns `false` if the id is not a live brick.
    pub fn brick_remove(&mut self, brick: BrickId) -> bool {
        let Some(idx) = self.brick_index.get(brick as usize).copied().flatten() else {
            return false;
        };
        for i in 0..self.shape_order.len() {
            let shape = &mut self.shapes[self.shape_order[i] as usize];
            if shape.visible[brick as usize] {
                let p = shape.pos[brick as usize];
                shape.visible[brick as usize] = false;
                shape.occupied.remove(&pack_xy(p.x, p.y));
            }
        }
        self.brick_ids.swap_remove(idx as usize);
        if let Some(&moved) = self.brick_ids.get(idx as usize) {
            self.brick_index[moved as usize] = Some(idx);
        }
        self.brick_index[brick as usize] = None;
        self.free_brick_ids.push(brick);
        for i in 0..self.shape_order.len() {
            self.calc_shape_caches(self.shape_order[i]);
        }
        self.calc_widest_highest();
        true
    }

    /// Replaces a brick's tile. Empty tiles are promoted to the sentinel.
    pub fn brick_modify(&mut self, brick: BrickId, tile: Tile) -> bool {
        if !self.is_brick(brick) {
            return false;
        }
        self.tiles[brick as usize] = tile.or_sentinel();
        true
    }

    // ---- shape mutations ----

    /// Inserts a fresh shape (all bricks invisible at the origin) before
    /// the given shape, or at the end when `before` is `None`.
    pub fn shape_insert(&mut self, before: Option<ShapeId>) -> ShapeId {
        let sid = self.alloc_shape();
        let cap = self.tiles.len();
        Self::fill_shape(&mut self.shapes[sid as usize], &[], cap);
        self.link_shape(sid, before);
        self.calc_shape_caches(sid);
        self.calc_widest_highest();
        sid
    }

    /// Inserts a copy of an existing shape.
    pub fn shape_insert_copy(&mut self, before: Option<ShapeId>, of: ShapeId) -> ShapeId {
        debug_assert!(self.is_shape(of));
        let sid = self.alloc_shape();
        self.shapes[sid as usize] = self.shapes[of as usize].clone();
        self.link_shape(sid, before);
        self.calc_widest_highest();
        sid
    }

    /// Removes a shape, freeing its id. Returns `false` for a dead id.
    pub fn shape_remove(&mut self, shape: ShapeId) -> bool {
        if !self.is_shape(shape) {
            return false;
        }
        if let Some(i) = self.shape_order.iter().position(|&s| s == shape) {
            self.shape_order.remove(i);
        }
        self.shape_live[shape as usize] = false;
        self.free_shape_ids.push(shape);
        let data = &mut self.shapes[shape as usize];
        data.occupied.clear();
        for m in &mut data.contacts {
            m.clear();
        }
        self.calc_widest_highest();
        true
    }

    /// Removes every shape without a single visible brick. Returns how many
    /// were removed.
    pub fn shape_remove_all_invisible(&mut self) -> usize {
        let empty: Vec<ShapeId> = self
            .shape_order
            .iter()
            .copied()
            .filter(|&sid| self.shapes[sid as usize].occupied.is_empty())
            .collect();
        for sid in &empty {
            self.shape_remove(*sid);
        }
        empty.len()
    }

    /// Shows or hides one brick within one shape.
    ///
    /// Returns `false` (and changes nothing) when showing the brick would
    /// collide with another visible brick of the shape.
    pub fn shape_brick_set_visible(&mut self, shape: ShapeId, brick: BrickId, visible: bool) -> bool {
        debug_assert!(self.is_shape(shape) && self.is_brick(brick));
        let ok = Self::set_visible(&mut self.shapes[shape as usize], brick, visible);
        self.calc_shape_caches(shape);
        self.calc_widest_highest();
        ok
    }

    /// Moves one brick within one shape, then applies the requested
    /// visibility.
    ///
    /// The position is applied unconditionally; the brick ends hidden if
    /// the target cell is taken, in which case `false` is returned.
    pub fn shape_brick_set_pos_visible(
        &mut self,
        shape: ShapeId,
        brick: BrickId,
        pos: Point,
        visible: bool,
    ) -> bool {
        debug_assert!(self.is_shape(shape) && self.is_brick(brick));
        let ok = Self::set_pos_visible(&mut self.shapes[shape as usize], brick, pos, visible);
        self.calc_shape_caches(shape);
        self.calc_widest_highest();
        ok
    }

    /// Applies a batch of brick moves to one shape.
    ///
    /// Two passes: first every brick in the batch vacates its old cell and
    /// takes its new position, then visibility is applied per brick in
    /// order, hiding bricks whose target cell is taken. Bricks may swap
    /// cells within one batch. Returns `true` only if every brick got its
    /// requested visibility. Caches are recomputed once at the end.
    pub fn shape_modify_bricks(&mut self, shape: ShapeId, changes: &[BrickChange]) -> bool {
        debug_assert!(self.is_shape(shape));
        debug_assert!(changes.iter().all(|&(b, _, _)| self.is_brick(b)));
        let data = &mut self.shapes[shape as usize];
        for &(brick, pos, _) in changes {
            let b = brick as usize;
            if data.visible[b] {
                let old = data.pos[b];
                data.occupied.remove(&pack_xy(old.x, old.y));
                data.visible[b] = false;
            }
            data.pos[b] = pos;
        }
        let mut ok = true;
        for &(brick, _, visible) in changes {
            ok = Self::set_visible(data, brick, visible) && ok;
        }
        self.calc_shape_caches(shape);
        self.calc_widest_highest();
        ok
    }

    // ---- queries ----

    /// Whether the block has no bricks. Shapes do not count; a block can
    /// hold bricks while (transiently) having no shape at all.
    pub fn is_empty(&self) -> bool {
        self.brick_ids.is_empty()
    }

    pub fn tot_bricks(&self) -> usize {
        self.brick_ids.len()
    }

    /// Live brick ids, arbitrary but stable order.
    pub fn brick_ids(&self) -> &[BrickId] {
        &self.brick_ids
    }

    pub fn is_brick(&self, brick: BrickId) -> bool {
        self.brick_index
            .get(brick as usize)
            .map_or(false, |i| i.is_some())
    }

    pub fn brick_tile(&self, brick: BrickId) -> Tile {
        debug_assert!(self.is_brick(brick));
        self.tiles[brick as usize]
    }

    pub fn tot_shapes(&self) -> usize {
        self.shape_order.len()
    }

    /// Live shape ids in insertion order.
    pub fn shape_ids(&self) -> &[ShapeId] {
        &self.shape_order
    }

    pub fn is_shape(&self, shape: ShapeId) -> bool {
        self.shape_live.get(shape as usize).copied().unwrap_or(false)
    }

    pub fn shape_first(&self) -> Option<ShapeId> {
        self.shape_order.first().copied()
    }

    pub fn shape_last(&self) -> Option<ShapeId> {
        self.shape_order.last().copied()
    }

    /// Next shape in insertion order, wrapping around. Used to cycle
    /// through rotations.
    pub fn shape_next(&self, shape: ShapeId) -> Option<ShapeId> {
        let i = self.shape_order.iter().position(|&s| s == shape)?;
        Some(self.shape_order[(i + 1) % self.shape_order.len()])
    }

    /// Previous shape in insertion order, wrapping around.
    pub fn shape_prec(&self, shape: ShapeId) -> Option<ShapeId> {
        let i = self.shape_order.iter().position(|&s| s == shape)?;
        Some(self.shape_order[(i + self.shape_order.len() - 1) % self.shape_order.len()])
    }

    pub fn shape_brick_pos(&self, shape: ShapeId, brick: BrickId) -> Point {
        debug_assert!(self.is_shape(shape) && self.is_brick(brick));
        self.shapes[shape as usize].pos[brick as usize]
    }

    pub fn shape_brick_visible(&self, shape: ShapeId, brick: BrickId) -> bool {
        debug_assert!(self.is_shape(shape) && self.is_brick(brick));
        self.shapes[shape as usize].visible[brick as usize]
    }

    /// Visible brick at the given cell of a shape, if any.
    pub fn shape_brick_at(&self, shape: ShapeId, pos: Point) -> Option<BrickId> {
        debug_assert!(self.is_shape(shape));
        self.shapes[shape as usize]
            .occupied
            .get(&pack_xy(pos.x, pos.y))
            .copied()
    }

    pub fn shape_tot_visible(&self, shape: ShapeId) -> usize {
        debug_assert!(self.is_shape(shape));
        self.shapes[shape as usize].occupied.len()
    }

    /// Upper-left corner of the visible bounding box.
    pub fn shape_min_pos(&self, shape: ShapeId) -> Point {
        debug_assert!(self.is_shape(shape));
        self.shapes[shape as usize].min_pos
    }

    pub fn shape_max_pos(&self, shape: ShapeId) -> Point {
        debug_assert!(self.is_shape(shape));
        self.shapes[shape as usize].max_pos
    }

    /// Size of the visible bounding box; zero when nothing is visible.
    pub fn shape_size(&self, shape: ShapeId) -> Size {
        debug_assert!(self.is_shape(shape));
        let d = &self.shapes[shape as usize];
        if d.occupied.is_empty() {
            return Size::default();
        }
        Size::new(d.max_pos.x - d.min_pos.x + 1, d.max_pos.y - d.min_pos.y + 1)
    }

    /// Free cells adjacent to the shape in the given direction, sorted by
    /// position for deterministic iteration.
    pub fn shape_contacts(&self, shape: ShapeId, dir: Direction) -> Vec<Contact> {
        debug_assert!(self.is_shape(shape));
        let mut out: Vec<Contact> = self.shapes[shape as usize].contacts[dir.index()]
            .iter()
            .map(|(&key, &brick)| Contact {
                pos: unpack_xy(key),
                brick,
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Width of the widest shape; zero when no shape has visible bricks.
    pub fn max_width(&self) -> i32 {
        self.max_width
    }

    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    /// First shape in insertion order reaching [`Block::max_width`].
    pub fn widest_shape(&self) -> Option<ShapeId> {
        self.widest
    }

    pub fn highest_shape(&self) -> Option<ShapeId> {
        self.highest
    }

    // ---- internals ----

    fn assign_bricks(&mut self, tiles: &[Tile]) {
        for (i, t) in tiles.iter().enumerate() {
            self.brick_ids.push(i as BrickId);
            self.brick_index.push(Some(i as u32));
            self.tiles.push(t.or_sentinel());
        }
    }

    /// Appends a brand new arena slot, bypassing the free list.
    fn push_brick(&mut self, tile: Tile) -> BrickId {
        let id = self.tiles.len() as BrickId;
        self.brick_index.push(Some(self.brick_ids.len() as u32));
        self.brick_ids.push(id);
        self.tiles.push(tile.or_sentinel());
        id
    }

    fn alloc_shape(&mut self) -> ShapeId {
        match self.free_shape_ids.pop() {
            Some(id) => {
                self.shape_live[id as usize] = true;
                id
            }
            None => {
                let id = self.shapes.len() as ShapeId;
                self.shapes.push(ShapeData::default());
                self.shape_live.push(true);
                id
            }
        }
    }

    fn link_shape(&mut self, sid: ShapeId, before: Option<ShapeId>) {
        match before.and_then(|b| self.shape_order.iter().position(|&s| s == b)) {
            Some(i) => self.shape_order.insert(i, sid),
            None => self.shape_order.push(sid),
        }
    }

    fn fill_shape(shape: &mut ShapeData, defs: &[BrickDef], cap: usize) {
        shape.pos = vec![Point::default(); cap];
        shape.visible = vec![false; cap];
        shape.occupied.clear();
        for m in &mut shape.contacts {
            m.clear();
        }
        for (bid, &(vis, x, y)) in defs.iter().enumerate().take(cap) {
            shape.pos[bid] = Point::new(x, y);
            if vis {
                if let Entry::Vacant(e) = shape.occupied.entry(pack_xy(x, y)) {
                    e.insert(bid as BrickId);
                    shape.visible[bid] = true;
                }
            }
        }
    }

    /// Appends three counterclockwise rotations of `src` within a `wh`
    /// square: `(x, y)` maps to `((wh - 1) - y, x)`.
    fn append_rotations(&mut self, src: ShapeId, wh: i32) {
        let mut prev = src;
        for _ in 0..3 {
            let sid = self.alloc_shape();
            self.rotate_from(prev, sid, wh);
            self.shape_order.push(sid);
            self.calc_shape_caches(sid);
            prev = sid;
        }
    }

    fn rotate_from(&mut self, src: ShapeId, dst: ShapeId, wh: i32) {
        let cap = self.tiles.len();
        let src_pos = self.shapes[src as usize].pos.clone();
        let src_vis = self.shapes[src as usize].visible.clone();
        let shape = &mut self.shapes[dst as usize];
        shape.pos = vec![Point::default(); cap];
        shape.visible = vec![false; cap];
        shape.occupied.clear();
        for bid in 0..cap {
            let p = src_pos[bid];
            let np = Point::new((wh - 1) - p.y, p.x);
            shape.pos[bid] = np;
            if src_vis[bid] {
                // the rotation is a bijection, no two bricks can land on
                // the same cell
                let old = shape.occupied.insert(pack_xy(np.x, np.y), bid as BrickId);
                debug_assert!(old.is_none());
                shape.visible[bid] = true;
            }
        }
    }

    fn set_visible(shape: &mut ShapeData, brick: BrickId, visible: bool) -> bool {
        let b = brick as usize;
        if shape.visible[b] == visible {
            return true;
        }
        let key = pack_xy(shape.pos[b].x, shape.pos[b].y);
        if visible {
            match shape.occupied.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(brick);
                    shape.visible[b] = true;
                    true
                }
                Entry::Occupied(_) => false,
            }
        } else {
            shape.occupied.remove(&key);
            shape.visible[b] = false;
            true
        }
    }

    fn set_pos_visible(shape: &mut ShapeData, brick: BrickId, pos: Point, visible: bool) -> bool {
        let b = brick as usize;
        if shape.visible[b] {
            let old = shape.pos[b];
            shape.occupied.remove(&pack_xy(old.x, old.y));
            shape.visible[b] = false;
        }
        shape.pos[b] = pos;
        Self::set_visible(shape, brick, visible)
    }

    /// Recomputes the visible bounds and the four contact maps of a shape.
    fn calc_shape_caches(&mut self, sid: ShapeId) {
        let ShapeData {
            occupied,
            contacts,
            min_pos,
            max_pos,
            ..
        } = &mut self.shapes[sid as usize];
        let mut min = Point::new(i32::MAX, i32::MAX);
        let mut max = Point::new(i32::MIN, i32::MIN);
        for &key in occupied.keys() {
            let p = unpack_xy(key);
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if occupied.is_empty() {
            min = Point::default();
            max = Point::new(-1, -1);
        }
        *min_pos = min;
        *max_pos = max;
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            let map = &mut contacts[dir.index()];
            map.clear();
            for (&key, &brick) in occupied.iter() {
                let p = unpack_xy(key);
                let ckey = pack_xy(p.x + dx, p.y + dy);
                if !occupied.contains_key(&ckey) {
                    map.insert(ckey, brick);
                }
            }
        }
    }

    /// Widest and highest shapes; ties keep the first shape in insertion
    /// order since only a strictly larger size replaces the candidate.
    fn calc_widest_highest(&mut self) {
        let mut max_w = 0;
        let mut max_h = 0;
        let mut widest = None;
        let mut highest = None;
        for &sid in &self.shape_order {
            let d = &self.shapes[sid as usize];
            if d.occupied.is_empty() {
                continue;
            }
            let w = d.max_pos.x - d.min_pos.x + 1;
            let h = d.max_pos.y - d.min_pos.y + 1;
            if w > max_w {
                max_w = w;
                widest = Some(sid);
            }
            if h > max_h {
                max_h = h;
                highest = Some(sid);
            }
        }
        self.max_width = max_w;
        self.max_height = max_h;
        self.widest = widest;
        self.highest = highest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles(n: usize) -> Vec<Tile> {
        (0..n).map(|i| Tile::with_color('#', i as u8)).collect()
    }

    #[test]
    fn test_rotation_formula() {
        // single brick at (2, 0) in a 3x3 square
        let b = Block::with_rotations(&tiles(1), &[(true, 2, 0)], 3);
        let sids = b.shape_ids().to_vec();
        assert_eq!(sids.len(), 4);
        assert_eq!(b.shape_brick_pos(sids[0], 0), Point::new(2, 0));
        assert_eq!(b.shape_brick_pos(sids[1], 0), Point::new(2, 2));
        assert_eq!(b.shape_brick_pos(sids[2], 0), Point::new(0, 2));
        assert_eq!(b.shape_brick_pos(sids[3], 0), Point::new(0, 0));
    }

    #[test]
    fn test_brick_id_recycled() {
        let mut b = Block::from_shapes(&tiles(2), &[vec![(true, 0, 0), (true, 1, 0)]]);
        assert!(b.brick_remove(0));
        assert!(!b.is_brick(0));
        let bid = b.brick_add(Tile::new('x'), Point::new(2, 0), true);
        assert_eq!(bid, 0);
        assert_eq!(b.tot_bricks(), 2);
    }

    #[test]
    fn test_overlapping_defs_first_wins() {
        let defs = vec![(true, 1, 1), (true, 1, 1)];
        let b = Block::from_shapes(&tiles(2), &[defs]);
        let sid = b.shape_first().unwrap();
        assert!(b.shape_brick_visible(sid, 0));
        assert!(!b.shape_brick_visible(sid, 1));
        assert_eq!(b.shape_tot_visible(sid), 1);
    }

    #[test]
    fn test_shape_remove_frees_id() {
        let mut b = Block::from_shapes(&tiles(1), &[vec![(true, 0, 0)], vec![(true, 1, 0)]]);
        let sids = b.shape_ids().to_vec();
        assert!(b.shape_remove(sids[0]));
        assert!(!b.is_shape(sids[0]));
        let again = b.shape_insert(None);
        assert_eq!(again, sids[0]);
        assert_eq!(b.tot_shapes(), 2);
    }
}
