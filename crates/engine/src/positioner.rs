//! Camera tracker event machine.
//!
//! Periodically computes the bounding rectangle of the controlled block
//! instances and, when it drifts out of a tracking window inside the
//! viewport, moves the viewport toward a new target over a configurable
//! number of ticks with linear interpolation, snapping exactly onto the
//! target on the final tick. Targets are always clamped so the viewport
//! stays inside the board.

use blockfall_types::{PointF, Rect, Size};

use blockfall_core::{EventId, Level};

/// Static configuration of a [`PositionerEvent`].
#[derive(Debug, Clone)]
pub struct PositionerConfig {
    /// Window inside the viewport, relative to its top left corner, that
    /// the tracked rectangle should stay within.
    pub tracking: Rect,
    /// How often to re-evaluate the tracked rectangle.
    pub check_each_ticks: i64,
    /// Over how many ticks a viewport move is spread. Zero jumps
    /// immediately.
    pub transition_ticks: i32,
}

impl Default for PositionerConfig {
    fn default() -> Self {
        PositionerConfig {
            tracking: Rect::new(0, 0, 1, 1),
            check_each_ticks: 1,
            transition_ticks: 0,
        }
    }
}

/// Pause and resume messages for [`PositionerEvent::trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionerMsg {
    Pause,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Activate,
    Init,
    Tracking,
}

/// Keeps the level's viewport near the controlled block instances.
pub struct PositionerEvent {
    event_id: EventId,
    cfg: PositionerConfig,
    state: State,
    paused: bool,
    last_check: i64,
    pos: PointF,
    target: PointF,
    /// Ticks left in the current transition, negative when idle.
    ticks_to_target: i32,
    /// Tracked rectangle of the last successful scan, used when no
    /// controlled instance is on the level for one check.
    last_rect: Option<Rect>,
}

impl PositionerEvent {
    pub fn new(event_id: EventId, level: &Level, cfg: PositionerConfig) -> Self {
        let show = level.show().size();
        debug_assert!(cfg.check_each_ticks >= 1);
        debug_assert!(cfg.transition_ticks >= 0);
        debug_assert!(!cfg.tracking.is_empty());
        debug_assert!(cfg.tracking.x >= 0 && cfg.tracking.y >= 0);
        debug_assert!(cfg.tracking.x + cfg.tracking.w <= show.w);
        debug_assert!(cfg.tracking.y + cfg.tracking.h <= show.h);
        PositionerEvent {
            event_id,
            cfg,
            state: State::Activate,
            paused: false,
            last_check: 0,
            pos: PointF::default(),
            target: PointF::default(),
            ticks_to_target: -1,
            last_rect: None,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Viewport position committed at the last tick.
    pub fn pos(&self) -> PointF {
        self.pos
    }

    /// Whether a transition is in progress.
    pub fn in_transition(&self) -> bool {
        self.ticks_to_target > 0
    }

    /// Runs one step, or handles a pause or resume message when `external`.
    pub fn trigger(&mut self, level: &mut Level, msg: Option<PositionerMsg>, external: bool) {
        let now = level.now();
        if self.state == State::Activate {
            self.state = State::Init;
            if external {
                level.event_activate(self.event_id, now);
                return;
            }
        }
        if self.state == State::Init {
            if external {
                level.event_activate(self.event_id, now);
                return;
            }
            // make the first scheduled step check immediately
            self.last_check = now - self.cfg.check_each_ticks;
            self.pos = level.show().pos();
            self.state = State::Tracking;
        }
        if external {
            match msg {
                Some(PositionerMsg::Pause) if !self.paused => {
                    self.paused = true;
                    level.event_deactivate(self.event_id);
                }
                Some(PositionerMsg::Resume) if self.paused => {
                    self.paused = false;
                    level.event_activate(self.event_id, now);
                }
                _ => {}
            }
            return;
        }
        if self.paused {
            return;
        }
        if self.ticks_to_target > 0 {
            self.handle_transition(level);
        }
        if now >= self.last_check + self.cfg.check_each_ticks {
            self.check_new_position(level);
            self.last_check = now;
        }
        if self.ticks_to_target > 0 {
            level.event_activate(self.event_id, now + 1);
        } else {
            level.event_activate(self.event_id, self.last_check + self.cfg.check_each_ticks);
        }
    }

    /// Advances the running transition by one tick and commits the new
    /// viewport position. The final tick lands exactly on the target.
    fn handle_transition(&mut self, level: &mut Level) {
        self.ticks_to_target -= 1;
        if self.ticks_to_target == 0 {
            self.pos = self.target;
            self.ticks_to_target = -1;
        } else {
            let left = (self.ticks_to_target + 1) as f64;
            self.pos.x += (self.target.x - self.pos.x) / left;
            self.pos.y += (self.target.y - self.pos.y) / left;
        }
        level.show_mut().set_pos(self.pos);
    }

    /// Re-evaluates the tracked rectangle and starts a transition when it
    /// left the tracking window.
    fn check_new_position(&mut self, level: &mut Level) {
        let rect = match self.controlled_rect(level) {
            Some(r) => {
                self.last_rect = Some(r);
                r
            }
            None => match self.last_rect.take() {
                Some(r) => r,
                None => return,
            },
        };
        let show = level.show().size();
        let parent = Size::new(level.width(), level.height());
        let tx = self.axis_target(
            rect.x,
            rect.w,
            self.pos.x,
            self.cfg.tracking.x,
            self.cfg.tracking.w,
            show.w,
            parent.w,
        );
        let ty = self.axis_target(
            rect.y,
            rect.h,
            self.pos.y,
            self.cfg.tracking.y,
            self.cfg.tracking.h,
            show.h,
            parent.h,
        );
        let target = PointF::new(tx, ty);
        if target == self.pos {
            return;
        }
        self.target = target;
        if self.cfg.transition_ticks == 0 {
            self.pos = target;
            self.ticks_to_target = -1;
            level.show_mut().set_pos(self.pos);
        } else {
            self.ticks_to_target = self.cfg.transition_ticks;
        }
    }

    /// Target viewport coordinate for one axis: unchanged while the
    /// tracked span fits in the tracking window, otherwise centered on the
    /// span and clamped so the viewport stays inside the board.
    #[allow(clippy::too_many_arguments)]
    fn axis_target(
        &self,
        rect_pos: i32,
        rect_len: i32,
        view_pos: f64,
        track_pos: i32,
        track_len: i32,
        show_len: i32,
        parent_len: i32,
    ) -> f64 {
        let lo = view_pos + track_pos as f64;
        let hi = lo + track_len as f64;
        let inside = rect_pos as f64 >= lo && (rect_pos + rect_len) as f64 <= hi;
        if inside {
            return view_pos;
        }
        // center the tracked span in the tracking window
        let centered =
            rect_pos as f64 + (rect_len as f64 - track_len as f64) * 0.5 - track_pos as f64;
        centered.clamp(0.0, (parent_len - show_len) as f64)
    }

    /// Bounding rectangle of all visible, player-controlled instances.
    fn controlled_rect(&self, level: &Level) -> Option<Rect> {
        let mut acc = Rect::default();
        for lb in level.blocks() {
            if lb.player().is_none() {
                continue;
            }
            let r = lb.rect();
            if r.is_empty() {
                continue;
            }
            acc = Rect::bounding(acc, r);
        }
        if acc.is_empty() {
            None
        } else {
            Some(acc)
        }
    }

    /// Interpolated viewport position for drawing between two ticks, after
    /// `view_tick + 1` of `tot_view_ticks` sub-steps of the next tick's
    /// move. The last view tick lands on the next committed position.
    /// Equals the committed position outside a transition.
    pub fn pos_at_view_tick(&self, view_tick: i32, tot_view_ticks: i32) -> PointF {
        if self.ticks_to_target <= 0 || tot_view_ticks <= 0 {
            return self.pos;
        }
        let frac = ((1 + view_tick) as f64 / tot_view_ticks as f64).clamp(0.0, 1.0);
        let left = (self.ticks_to_target + 1) as f64;
        let step_x = (self.target.x - self.pos.x) / left;
        let step_y = (self.target.y - self.pos.y) / left;
        PointF::new(self.pos.x + step_x * frac, self.pos.y + step_y * frac)
    }
}
