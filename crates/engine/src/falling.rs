//! A minimal falling-block event machine.
//!
//! Places one block instance on the level, lets it fall one cell per
//! scheduled step, and freezes it onto the board when a board change
//! (scroll or row insertion) would push it into occupied territory.
//! Deliberately has no input handling or line clearing; it exercises the
//! level's placement, contact and freeze machinery.

use blockfall_types::{Direction, Point, Rect};

use blockfall_core::{
    AttackOutcome, Block, EventId, Level, LevelBlock, LevelBlockId, Mgmt,
};

/// Drawing depth of the falling instance, in front of frozen board tiles.
pub const FALLING_BLOCK_Z: i32 = 10;

/// What the machine tells the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallingSignal {
    /// The instance was placed on the level.
    CouldPlace,
    /// Placement failed, the spawn cells were taken.
    CannotPlace,
    /// The machine is done, either after a failed placement or after the
    /// instance froze.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Activate,
    Init,
    Place,
    Fall,
    Zombie,
}

/// One-shot controller for a single falling instance.
pub struct FallingBlockEvent {
    event_id: EventId,
    block: Option<Block>,
    init_pos: Point,
    fall_each_ticks: i64,
    state: State,
    block_id: Option<LevelBlockId>,
    signals: Vec<FallingSignal>,
}

impl FallingBlockEvent {
    /// `fall_each_ticks` values below one fall back to one.
    pub fn new(event_id: EventId, block: Block, init_pos: Point, fall_each_ticks: i64) -> Self {
        FallingBlockEvent {
            event_id,
            block: Some(block),
            init_pos,
            fall_each_ticks: fall_each_ticks.max(1),
            state: State::Activate,
            block_id: None,
            signals: Vec::new(),
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// The placed instance, while one exists.
    pub fn block_id(&self) -> Option<LevelBlockId> {
        self.block_id
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Zombie
    }

    /// Drains the signals emitted since the last call.
    pub fn take_signals(&mut self) -> Vec<FallingSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Runs one step. `external` marks triggers that do not come from the
    /// level scheduler; they only advance the machine up to its first
    /// scheduled step.
    pub fn trigger(&mut self, level: &mut Level, external: bool) {
        let now = level.now();
        if self.state == State::Activate {
            let empty = self.block.as_ref().map_or(true, Block::is_empty);
            if empty {
                self.state = State::Zombie;
                self.signals.push(FallingSignal::Finished);
                return;
            }
            self.state = State::Init;
            if external {
                level.event_activate(self.event_id, now);
                return;
            }
        }
        if self.state == State::Init {
            if external {
                return;
            }
            self.state = State::Place;
        }
        if self.state == State::Place {
            if external {
                return;
            }
            self.place(level);
            return;
        }
        if self.state == State::Fall && !external {
            self.fall_step(level);
        }
    }

    fn place(&mut self, level: &mut Level) {
        let block = match self.block.take() {
            Some(b) => b,
            None => {
                self.state = State::Zombie;
                return;
            }
        };
        let lb = LevelBlock::new(
            block,
            None,
            self.init_pos,
            FALLING_BLOCK_Z,
            false,
            None,
            true,
        );
        match level.block_add(lb, Mgmt::AutoStrictOwner) {
            Ok(id) => {
                self.block_id = Some(id);
                self.state = State::Fall;
                level.listener_add(id);
                self.signals.push(FallingSignal::CouldPlace);
                level.event_activate(self.event_id, level.now() + self.fall_each_ticks);
            }
            Err(_) => {
                self.state = State::Zombie;
                self.signals.push(FallingSignal::CannotPlace);
                self.signals.push(FallingSignal::Finished);
            }
        }
    }

    fn fall_step(&mut self, level: &mut Level) {
        if self.block_id.is_none() {
            self.state = State::Zombie;
            return;
        }
        if self.can_move_clipped(level, Direction::Down, Rect::default()) {
            if let Some(id) = self.block_id {
                level.block_move(id, 0, 1);
            }
        }
        level.event_activate(self.event_id, level.now() + self.fall_each_ticks);
    }

    /// Whether the instance can move one cell in `dir`: every contact cell
    /// must be inside the board, over an empty tile, and unowned. A
    /// non-empty `clip` restricts the test to contacts inside it.
    pub fn can_move(&self, level: &mut Level, dir: Direction) -> bool {
        self.can_move_clipped(level, dir, Rect::default())
    }

    fn can_move_clipped(&self, level: &mut Level, dir: Direction, clip: Rect) -> bool {
        let Some(id) = self.block_id else {
            return false;
        };
        let Some(lb) = level.block_mut(id) else {
            return false;
        };
        let pos = lb.pos();
        let contacts = lb.contacts(dir).to_vec();
        for c in contacts {
            let p = pos + c.pos;
            if !clip.is_empty() && !clip.contains(p) {
                continue;
            }
            if !level.is_inside(p) {
                return false;
            }
            if !level.board_tile(p).is_empty() || level.owner(p).is_some() {
                return false;
            }
        }
        true
    }

    /// Moves the instance one cell in `dir` when the contacts are free.
    /// Returns whether it moved.
    pub fn move_dir(&mut self, level: &mut Level, dir: Direction) -> bool {
        if !self.can_move_clipped(level, dir, Rect::default()) {
            return false;
        }
        let Some(id) = self.block_id else {
            return false;
        };
        let (dx, dy) = dir.delta();
        level.block_move(id, dx, dy);
        true
    }

    /// Freezes the instance onto the board and finishes the machine.
    /// Returns `false` when there is no instance.
    pub fn freeze(&mut self, level: &mut Level) -> bool {
        let Some(id) = self.block_id.take() else {
            return false;
        };
        let ok = level.block_freeze(id);
        debug_assert!(ok);
        level.event_deactivate(self.event_id);
        self.state = State::Zombie;
        self.signals.push(FallingSignal::Finished);
        ok
    }

    /// Board-change notification: the board is about to scroll one cell.
    /// Freezes the instance when it cannot follow the scroll within the
    /// board.
    pub fn board_pre_scroll(&mut self, level: &mut Level, dir: Direction) {
        let Some(id) = self.block_id else {
            return;
        };
        let (dx, dy) = dir.delta();
        if !level.block_move_is_within_area(id, dx, dy, level.board_rect()) {
            self.freeze(level);
        }
    }

    /// Board-change notification: rows are about to be inserted (`Up`) or
    /// deleted (`Down`) within `area`. Freezes the instance when it cannot
    /// get out of the way. Other directions and areas not starting at row
    /// 0 are configuration errors, reported and ignored.
    pub fn board_pre_insert(&mut self, level: &mut Level, dir: Direction, area: Rect) {
        if self.block_id.is_none() {
            return;
        }
        if !matches!(dir, Direction::Up | Direction::Down) {
            level.report_technical(&[
                "FallingBlockEvent::board_pre_insert",
                "only Up and Down are supported",
            ]);
            return;
        }
        if area.y != 0 {
            level.report_technical(&[
                "FallingBlockEvent::board_pre_insert",
                "area must start at row 0",
            ]);
            return;
        }
        let last_row = area.y + area.h - 1;
        match dir {
            Direction::Down => {
                // content slides down, the instance must be able to move up
                if last_row > 0
                    && !self.can_move_clipped(
                        level,
                        Direction::Up,
                        Rect::new(area.x, 0, area.w, last_row),
                    )
                {
                    self.freeze(level);
                }
            }
            _ => {
                // content is pushed up, the instance must move down and
                // stay clear of the vacated bottom row
                if last_row > 0
                    && !self.can_move_clipped(
                        level,
                        Direction::Down,
                        Rect::new(area.x, 1, area.w, last_row),
                    )
                {
                    self.freeze(level);
                } else if let Some(id) = self.block_id {
                    if level.block_intersects_area(id, Rect::new(area.x, last_row, area.w, 1)) {
                        self.freeze(level);
                    }
                }
            }
        }
    }

    /// This machine never fuses its instance into another.
    pub fn can_fuse_with(&self, _other: LevelBlockId) -> bool {
        false
    }

    /// When attacked, the instance freezes.
    pub fn query_attack(&self) -> AttackOutcome {
        AttackOutcome::FreezeAttacked
    }

    /// Carries out the attack the machine announced: the instance freezes,
    /// freeing its cells for the attacker.
    pub fn attack(&mut self, level: &mut Level) -> AttackOutcome {
        if self.freeze(level) {
            AttackOutcome::FreesPosition
        } else {
            AttackOutcome::Nothing
        }
    }
}
