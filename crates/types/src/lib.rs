//! Core types shared across the engine crates.
//!
//! Pure data structures with no external dependencies: integer and float
//! coordinates, sizes, rectangles, the four cardinal directions and the
//! board/brick cell payload ([`Tile`]).

/// Integer cell coordinate. Used for brick positions within a shape and
/// for block and board positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Fractional position, used by the camera viewport which moves in
/// sub-cell steps during transitions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        PointF { x, y }
    }
}

/// Width and height in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub const fn new(w: i32, h: i32) -> Self {
        Size { w, h }
    }
}

/// Axis-aligned cell rectangle. A zero width or height means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// Smallest rectangle covering both inputs. An empty input contributes
    /// nothing.
    pub fn bounding(a: Rect, b: Rect) -> Rect {
        if a.is_empty() {
            return b;
        }
        if b.is_empty() {
            return a;
        }
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        let x2 = (a.x + a.w).max(b.x + b.w);
        let y2 = (a.y + a.h).max(b.y + b.h);
        Rect::new(x, y, x2 - x, y2 - y)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// The four cardinal directions, used for contact queries, board scrolls
/// and row insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Stable index into per-direction tables.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Unit step in cell coordinates. Up is negative y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Contents of one cell, either on the board or carried by a brick.
///
/// A tile is empty when it has neither glyph nor color. Bricks must always
/// carry a non-empty tile, so brick setters silently promote an empty tile
/// to [`Tile::SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tile {
    ch: Option<char>,
    color: Option<u8>,
}

impl Tile {
    pub const EMPTY: Tile = Tile {
        ch: None,
        color: None,
    };

    /// Placeholder payload for bricks created without an explicit tile.
    /// Uses the highest scalar value so it cannot collide with real glyphs.
    pub const SENTINEL: Tile = Tile {
        ch: Some('\u{10FFFF}'),
        color: None,
    };

    pub const fn new(ch: char) -> Self {
        Tile {
            ch: Some(ch),
            color: None,
        }
    }

    pub const fn with_color(ch: char, color: u8) -> Self {
        Tile {
            ch: Some(ch),
            color: Some(color),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ch.is_none() && self.color.is_none()
    }

    /// The tile itself when non-empty, [`Tile::SENTINEL`] otherwise.
    pub fn or_sentinel(self) -> Tile {
        if self.is_empty() {
            Tile::SENTINEL
        } else {
            self
        }
    }

    pub fn ch(&self) -> Option<char> {
        self.ch
    }

    pub fn color(&self) -> Option<u8> {
        self.color
    }
}

/// Packs a cell coordinate into a single map key.
pub fn pack_xy(x: i32, y: i32) -> i64 {
    ((x as i64) << 32) | (y as u32 as i64)
}

/// Inverse of [`pack_xy`].
pub fn unpack_xy(key: i64) -> Point {
    Point::new((key >> 32) as i32, key as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_roundtrip() {
        for &(x, y) in &[(0, 0), (5, -3), (-7, 11), (i32::MAX, i32::MIN)] {
            assert_eq!(unpack_xy(pack_xy(x, y)), Point::new(x, y));
        }
    }

    #[test]
    fn test_pack_negative_no_collision() {
        assert_ne!(pack_xy(0, -1), pack_xy(-1, 0));
        assert_ne!(pack_xy(1, 0), pack_xy(0, 1));
    }

    #[test]
    fn test_rect_bounding() {
        let a = Rect::new(0, 0, 2, 2);
        let b = Rect::new(3, 1, 2, 4);
        assert_eq!(Rect::bounding(a, b), Rect::new(0, 0, 5, 5));
        assert_eq!(Rect::bounding(a, Rect::default()), a);
    }

    #[test]
    fn test_direction_opposites() {
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            let (dx, dy) = d.delta();
            let (ox, oy) = d.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_empty_tile_promotes_to_sentinel() {
        assert_eq!(Tile::EMPTY.or_sentinel(), Tile::SENTINEL);
        let t = Tile::with_color('x', 3);
        assert_eq!(t.or_sentinel(), t);
    }
}
