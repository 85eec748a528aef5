//! Trigger position tracking
//!
//! The trigger's position is stored as an offset from a default anchor
//! (computed from the configured side and bottom margin), not as absolute
//! coordinates. Drags move freely; containment and edge snapping are only
//! resolved when the drag ends or the viewport resizes.

use tracing::{debug, info};

use crate::config::{PositionConfig, Side};
use crate::constants::keys;
use crate::snapping::{self, Rect};
use crate::storage::PersistentConfigStore;
use crate::types::{Position, Size};

/// In-memory drag state, never persisted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub start_pointer: Position,
    pub start_offset: Position,
    pub active: bool,
}

/// Result of ending a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEnd {
    /// Offset after snapping and clamping
    pub offset: Position,
    /// False when the pointer stayed within the click tolerance
    pub moved: bool,
}

/// Computes and persists the trigger offset
#[derive(Debug)]
pub struct PositionEngine {
    config: PositionConfig,
    store: PersistentConfigStore,
    offset: Position,
    viewport: Size,
    control: Size,
    drag: Option<DragSession>,
}

impl PositionEngine {
    /// Create the engine, restoring a previously persisted offset if it is
    /// well-formed.
    pub fn new(config: PositionConfig, store: PersistentConfigStore) -> Self {
        let offset = store
            .get_json::<Position>(keys::WIDGET_POSITION)
            .filter(Position::is_finite)
            .unwrap_or_default();
        debug!(x = offset.x, y = offset.y, "Restored trigger offset");

        Self {
            config,
            store,
            offset,
            viewport: Size::default(),
            control: Size::default(),
            drag: None,
        }
    }

    pub fn offset(&self) -> Position {
        self.offset
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some_and(|d| d.active)
    }

    pub fn drag_session(&self) -> Option<DragSession> {
        self.drag
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Record the measured trigger size
    pub fn set_control_size(&mut self, size: Size) {
        self.control = size;
    }

    /// Replace side and margins, e.g. after the admin trigger changed.
    /// The offset is kept; call `reconcile_to_viewport` to re-contain it.
    pub fn set_config(&mut self, config: PositionConfig) {
        self.config = config;
    }

    pub fn config(&self) -> PositionConfig {
        self.config
    }

    /// Record the viewport size without re-clamping
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Absolute origin of the trigger when the offset is zero.
    /// `None` until both the viewport and the control are measured.
    pub fn default_anchor(&self) -> Option<Position> {
        if !self.viewport.is_measured() || !self.control.is_measured() {
            return None;
        }
        let margin = self.config.margin_from_edge;
        let x = match self.config.side {
            Side::Left => margin,
            Side::Right => self.viewport.width - self.control.width - margin,
        };
        let y = self.viewport.height - self.control.height - self.config.bottom_margin;
        Some(Position::new(x, y))
    }

    /// Absolute origin of the trigger (`anchor + offset`)
    pub fn absolute_position(&self) -> Option<Position> {
        self.default_anchor().map(|anchor| anchor + self.offset)
    }

    pub fn start_drag(&mut self, pointer: Position) {
        self.drag = Some(DragSession {
            start_pointer: pointer,
            start_offset: self.offset,
            active: true,
        });
        debug!(x = pointer.x, y = pointer.y, "Drag started");
    }

    /// Follow the pointer without clamping. Returns the new offset while a
    /// drag is active.
    pub fn move_drag(&mut self, pointer: Position) -> Option<Position> {
        let session = self.drag.filter(|d| d.active)?;
        self.offset = session.start_offset + (pointer - session.start_pointer);
        Some(self.offset)
    }

    /// Finish the drag: snap to nearby edges, clamp inside the viewport and
    /// persist. A release within the click tolerance restores the starting
    /// offset and reports `moved: false`.
    pub fn end_drag(&mut self) -> Option<DragEnd> {
        let session = self.drag.take()?;

        let moved = self.offset.distance_max(session.start_offset) > self.config.click_tolerance;
        if !moved {
            self.offset = session.start_offset;
            return Some(DragEnd {
                offset: self.offset,
                moved: false,
            });
        }

        let Some(anchor) = self.default_anchor() else {
            debug!("Control not measured, cannot contain the drop, restoring start offset");
            self.offset = session.start_offset;
            return Some(DragEnd {
                offset: self.offset,
                moved: true,
            });
        };

        let absolute = anchor + self.offset;
        let margin = self.config.margin_from_edge;
        let snapped = snapping::find_edge_snap(
            Rect::new(absolute, self.control),
            self.viewport,
            self.config.snap_threshold,
            margin,
        )
        .unwrap_or(absolute);
        let contained = snapping::clamp_to_viewport(snapped, self.control, self.viewport, margin);

        self.offset = contained - anchor;
        self.persist();
        info!(x = contained.x, y = contained.y, "Trigger dropped");

        Some(DragEnd {
            offset: self.offset,
            moved: true,
        })
    }

    /// Abandon an in-flight drag (unmount). Nothing is persisted.
    pub fn cancel_drag(&mut self) {
        if let Some(session) = self.drag.take() {
            self.offset = session.start_offset;
            debug!("Drag cancelled");
        }
    }

    /// Move the trigger back to its default anchor
    pub fn reset_to_default(&mut self) {
        self.drag = None;
        self.offset = Position::ZERO;
        self.store.remove(keys::WIDGET_POSITION);
        info!("Trigger position reset");
    }

    /// Re-clamp (no snapping) after a viewport change so a stored offset never
    /// leaves the trigger off-screen. Persists only when the offset changed.
    pub fn reconcile_to_viewport(&mut self, viewport: Size) -> Position {
        self.viewport = viewport;
        if self.is_dragging() {
            return self.offset;
        }
        let Some(anchor) = self.default_anchor() else {
            return self.offset;
        };

        let absolute = anchor + self.offset;
        let contained = snapping::clamp_to_viewport(
            absolute,
            self.control,
            self.viewport,
            self.config.margin_from_edge,
        );
        if contained != absolute {
            self.offset = contained - anchor;
            self.persist();
            info!(width = viewport.width, height = viewport.height, x = contained.x, y = contained.y, "Trigger re-clamped after resize");
        }
        self.offset
    }

    fn persist(&self) {
        self.store.set_json(keys::WIDGET_POSITION, &self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::denied_durable;
    use proptest::prelude::*;

    const VIEWPORT: Size = Size {
        width: 1000.0,
        height: 800.0,
    };
    const CONTROL: Size = Size {
        width: 56.0,
        height: 56.0,
    };

    fn engine_with(store: PersistentConfigStore) -> PositionEngine {
        let mut engine = PositionEngine::new(PositionConfig::default(), store);
        engine.set_viewport(VIEWPORT);
        engine.set_control_size(CONTROL);
        engine
    }

    fn engine() -> PositionEngine {
        engine_with(PersistentConfigStore::in_memory())
    }

    fn drag_by(engine: &mut PositionEngine, dx: f64, dy: f64) -> DragEnd {
        let start = Position::new(950.0, 740.0);
        engine.start_drag(start);
        engine.move_drag(start + Position::new(dx, dy));
        engine.end_drag().unwrap()
    }

    fn assert_on_screen(engine: &PositionEngine, viewport: Size) {
        let abs = engine.absolute_position().unwrap();
        let margin = PositionConfig::default().margin_from_edge;
        assert!(abs.x >= margin - 1e-9, "x={} left of margin", abs.x);
        assert!(abs.y >= margin - 1e-9, "y={} above margin", abs.y);
        assert!(abs.x + CONTROL.width <= viewport.width - margin + 1e-9, "x={} past right", abs.x);
        assert!(abs.y + CONTROL.height <= viewport.height - margin + 1e-9, "y={} past bottom", abs.y);
    }

    #[test]
    fn test_default_anchor_right_side() {
        let engine = engine();
        assert_eq!(engine.default_anchor(), Some(Position::new(928.0, 720.0)));
    }

    #[test]
    fn test_default_anchor_left_side() {
        let config = PositionConfig {
            side: Side::Left,
            ..PositionConfig::default()
        };
        let mut engine = PositionEngine::new(config, PersistentConfigStore::in_memory());
        engine.set_viewport(VIEWPORT);
        engine.set_control_size(CONTROL);
        assert_eq!(engine.default_anchor(), Some(Position::new(16.0, 720.0)));
    }

    #[test]
    fn test_move_drag_is_unclamped() {
        let mut engine = engine();
        engine.start_drag(Position::new(100.0, 100.0));
        let offset = engine.move_drag(Position::new(-5000.0, 100.0)).unwrap();
        assert_eq!(offset, Position::new(-5100.0, 0.0));
        assert!(engine.is_dragging());
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut engine = engine();
        assert_eq!(engine.move_drag(Position::new(10.0, 10.0)), None);
        assert_eq!(engine.offset(), Position::ZERO);
    }

    #[test]
    fn test_end_drag_snaps_left_and_persists() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = engine_with(store.clone());

        let end = drag_by(&mut engine, -915.0, -300.0);
        assert!(end.moved);
        assert_eq!(engine.absolute_position().unwrap().x, 16.0);
        assert_eq!(store.get_json::<Position>(keys::WIDGET_POSITION), Some(end.offset));
    }

    #[test]
    fn test_end_drag_clamps_far_outside() {
        let mut engine = engine();
        drag_by(&mut engine, 4000.0, 4000.0);
        assert_on_screen(&engine, VIEWPORT);
    }

    #[test]
    fn test_small_release_is_click() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = engine_with(store.clone());
        let end = drag_by(&mut engine, 2.0, -1.0);
        assert!(!end.moved);
        assert_eq!(end.offset, Position::ZERO);
        assert_eq!(store.get_raw(keys::WIDGET_POSITION), None);
    }

    #[test]
    fn test_unmeasured_control_restores_start_offset() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = PositionEngine::new(PositionConfig::default(), store.clone());
        engine.set_viewport(VIEWPORT);
        let end = drag_by(&mut engine, -3000.0, -2000.0);
        assert_eq!(end.offset, Position::ZERO);
        assert_eq!(engine.offset(), Position::ZERO);
        assert!(!engine.is_dragging());
        assert_eq!(store.get_raw(keys::WIDGET_POSITION), None);

        // Measuring later places the trigger at its anchor, on screen
        engine.set_control_size(CONTROL);
        assert_on_screen(&engine, VIEWPORT);
    }

    #[test]
    fn test_set_config_moves_anchor_and_reconcile_contains() {
        let mut engine = engine_with(PersistentConfigStore::in_memory());
        drag_by(&mut engine, -400.0, -300.0);

        engine.set_config(PositionConfig {
            side: Side::Left,
            margin_from_edge: 10.0,
            ..PositionConfig::default()
        });
        engine.set_control_size(Size::new(68.0, 68.0));
        engine.reconcile_to_viewport(VIEWPORT);

        assert_eq!(engine.default_anchor(), Some(Position::new(10.0, 800.0 - 68.0 - 24.0)));
        let abs = engine.absolute_position().unwrap();
        assert_eq!(abs.x, 10.0);
        assert!(abs.y >= 10.0 && abs.y + 68.0 <= VIEWPORT.height - 10.0);
    }

    #[test]
    fn test_persistence_failure_keeps_memory_value() {
        let mut engine = engine_with(denied_durable());
        let end = drag_by(&mut engine, -400.0, -300.0);
        assert_eq!(engine.offset(), end.offset);
        assert_ne!(engine.offset(), Position::ZERO);
    }

    #[test]
    fn test_restores_persisted_offset_and_rejects_garbage() {
        let store = PersistentConfigStore::in_memory();
        store.set_raw(keys::WIDGET_POSITION, r#"{"x":-100.0,"y":-50.0}"#);
        assert_eq!(engine_with(store.clone()).offset(), Position::new(-100.0, -50.0));

        store.set_raw(keys::WIDGET_POSITION, r#"{"x":"left"}"#);
        assert_eq!(engine_with(store).offset(), Position::ZERO);
    }

    #[test]
    fn test_reset_to_default_clears_storage() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = engine_with(store.clone());
        drag_by(&mut engine, -400.0, -300.0);
        engine.reset_to_default();
        assert_eq!(engine.offset(), Position::ZERO);
        assert_eq!(store.get_raw(keys::WIDGET_POSITION), None);
    }

    #[test]
    fn test_cancel_drag_restores_start() {
        let mut engine = engine();
        engine.start_drag(Position::new(10.0, 10.0));
        engine.move_drag(Position::new(300.0, 300.0));
        engine.cancel_drag();
        assert_eq!(engine.offset(), Position::ZERO);
        assert!(!engine.is_dragging());
    }

    #[test]
    fn test_reconcile_after_shrink() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = engine_with(store.clone());
        drag_by(&mut engine, -700.0, -400.0);
        assert_on_screen(&engine, VIEWPORT);

        let narrow = Size::new(375.0, 600.0);
        engine.reconcile_to_viewport(narrow);
        assert_on_screen(&engine, narrow);
        assert_eq!(store.get_json::<Position>(keys::WIDGET_POSITION), Some(engine.offset()));
    }

    #[test]
    fn test_reconcile_valid_position_untouched() {
        let store = PersistentConfigStore::in_memory();
        let mut engine = engine_with(store.clone());
        let before = engine.reconcile_to_viewport(VIEWPORT);
        assert_eq!(before, Position::ZERO);
        assert_eq!(store.get_raw(keys::WIDGET_POSITION), None);
    }

    #[test]
    fn test_reconcile_zero_viewport_is_noop() {
        let mut engine = engine();
        drag_by(&mut engine, -400.0, -300.0);
        let before = engine.offset();
        assert_eq!(engine.reconcile_to_viewport(Size::new(0.0, 0.0)), before);
    }

    proptest! {
        #[test]
        fn prop_left_snap_independent_of_dx(target_x in -600.0f64..24.0, dy in -600.0f64..-100.0) {
            let mut engine = engine();
            let anchor = engine.default_anchor().unwrap();
            drag_by(&mut engine, target_x - anchor.x, dy);
            prop_assert_eq!(engine.absolute_position().unwrap().x, 16.0);
        }

        #[test]
        fn prop_drag_end_always_on_screen(dx in -3000.0f64..3000.0, dy in -3000.0f64..3000.0) {
            let mut engine = engine();
            drag_by(&mut engine, dx, dy);
            assert_on_screen(&engine, VIEWPORT);
        }

        #[test]
        fn prop_reconcile_always_on_screen(
            dx in -900.0f64..0.0,
            dy in -700.0f64..0.0,
            width in 200.0f64..1000.0,
            height in 200.0f64..800.0,
        ) {
            let mut engine = engine();
            drag_by(&mut engine, dx, dy);
            let viewport = Size::new(width, height);
            engine.reconcile_to_viewport(viewport);
            assert_on_screen(&engine, viewport);
        }
    }
}
