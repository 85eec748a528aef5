use std::cell::RefCell;
use std::rc::Rc;

use a11y_overlay::clock::ManualClock;
use a11y_overlay::config::FocusConfig;
use a11y_overlay::constants::{durations, keys};
use a11y_overlay::document::MemoryDocument;
use a11y_overlay::focus::{ElementId, ElementInfo, ListenerKind};
use a11y_overlay::input::KeyInput;
use a11y_overlay::notify::RecordingNotifier;
use a11y_overlay::settings::{SettingKey, SettingValue};
use a11y_overlay::*;

const VIEWPORT: Size = Size {
    width: 1280.0,
    height: 800.0,
};

struct Host {
    doc: Rc<MemoryDocument>,
    trigger: ElementId,
    panel: ElementId,
}

fn host() -> Host {
    let doc = Rc::new(MemoryDocument::new());
    let trigger = doc.append(doc.root(), ElementInfo::button());
    let panel = doc.append(doc.root(), ElementInfo::generic());
    doc.append(panel, ElementInfo::button());
    doc.append(panel, ElementInfo::link());
    Host { doc, trigger, panel }
}

fn context(durable: PersistentConfigStore, clock: &ManualClock) -> WidgetContext {
    WidgetContext {
        durable,
        ephemeral: EphemeralConfigStore::in_memory(),
        bus: ChangeBus::new(),
        clock: Rc::new(clock.clone()),
        notifier: Rc::new(RecordingNotifier::new()),
    }
}

fn file_store(path: &std::path::Path) -> PersistentConfigStore {
    PersistentConfigStore::new(Rc::new(FileStore::open(path)))
}

#[test]
fn test_week_hide_survives_restart_then_expires() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let clock = ManualClock::new(1_700_000_000_000);

    {
        let h = host();
        let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(file_store(&path), &clock));
        widget.mount(VIEWPORT);
        assert_eq!(widget.hide(HideOption::Week), RenderMode::Nothing);
    }

    clock.advance(durations::DAY_MS);
    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(file_store(&path), &clock));
    assert_eq!(widget.mount(VIEWPORT), RenderMode::Nothing);

    clock.advance(durations::WEEK_MS);
    assert_eq!(widget.refresh(), RenderMode::Trigger);
    drop(widget);

    let reopened = file_store(&path);
    assert_eq!(reopened.get_raw(keys::WIDGET_HIDDEN), None);
    assert_eq!(reopened.get_raw(keys::WIDGET_HIDDEN_UNTIL), None);
}

#[test]
fn test_session_hide_does_not_survive_new_session() {
    let durable = PersistentConfigStore::in_memory();
    let clock = ManualClock::new(0);

    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(durable.clone(), &clock));
    widget.mount(VIEWPORT);
    assert_eq!(widget.hide(HideOption::Session), RenderMode::Nothing);
    drop(widget);

    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(durable, &clock));
    assert_eq!(widget.mount(VIEWPORT), RenderMode::Trigger);
}

#[test]
fn test_settings_change_reaches_listener_and_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let clock = ManualClock::new(0);
    let ctx = context(file_store(&path), &clock);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _styles = ctx.bus.subscribe(Topic::Settings, move |event| {
        if let ChangeEvent::SettingsChanged(settings) = event {
            sink.borrow_mut().push(*settings);
        }
    });

    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, ctx);
    widget.mount(VIEWPORT);
    assert!(widget.update_setting(SettingKey::DyslexiaFont, SettingValue::Bool(true)));
    widget.settings().increase_font_size();
    drop(widget);

    assert_eq!(seen.borrow().len(), 2);
    let last = *seen.borrow().last().unwrap();
    assert!(last.dyslexia_font);
    assert_eq!(last.font_size_level, 1);

    let reloaded = SettingsReconciler::new(file_store(&path), ChangeBus::new());
    assert_eq!(reloaded.current(), last);
}

#[test]
fn test_admin_save_elsewhere_hides_trigger_after_refresh() {
    let clock = ManualClock::new(0);
    let ctx = context(PersistentConfigStore::in_memory(), &clock);
    let admin_panel = AdminSyncReconciler::new(ctx.durable.clone(), ctx.bus.clone());

    let h = host();
    h.doc.focus(h.trigger);
    let mut widget = Widget::new(WidgetConfig::default(), Rc::clone(&h.doc), h.panel, ctx);
    widget.mount(VIEWPORT);
    assert!(widget.open_panel());

    let mut config = admin_panel.config();
    config.trigger.hide_trigger = true;
    admin_panel.save(config);

    assert!(widget.admin().trigger_hidden());
    assert_eq!(widget.refresh(), RenderMode::Nothing);
    assert!(!widget.is_panel_open());
    assert_eq!(h.doc.active_element(), Some(h.trigger));
}

#[test]
fn test_rapid_reopen_with_delay_leaves_one_set_of_listeners() {
    let h = host();
    let config = WidgetConfig {
        focus: FocusConfig {
            initial_focus_delay_ms: 200,
        },
        ..WidgetConfig::default()
    };
    let clock = ManualClock::new(0);
    let mut widget = Widget::new(config, Rc::clone(&h.doc), h.panel, context(PersistentConfigStore::in_memory(), &clock));
    widget.mount(VIEWPORT);

    widget.open_panel();
    widget.close_panel();
    widget.open_panel();

    assert_eq!(h.doc.listeners_of(ListenerKind::KeyDown), 1);
    assert_eq!(h.doc.listeners_of(ListenerKind::FocusIn), 1);
    let timers = h.doc.pending_timers();
    assert_eq!(timers.len(), 1);

    let timer = timers[0];
    assert!(h.doc.fire_timer(timer));
    assert!(widget.on_timer(timer));
    let active = h.doc.active_element().unwrap();
    assert!(h.doc.contains(h.panel, active));

    drop(widget);
    assert_eq!(h.doc.listener_count(), 0);
    assert!(h.doc.pending_timers().is_empty());
}

#[test]
fn test_tab_wraps_inside_open_panel() {
    let h = host();
    let clock = ManualClock::new(0);
    let mut widget = Widget::new(
        WidgetConfig::default(),
        Rc::clone(&h.doc),
        h.panel,
        context(PersistentConfigStore::in_memory(), &clock),
    );
    widget.mount(VIEWPORT);
    widget.open_panel();

    let first = h.doc.active_element().unwrap();
    assert_eq!(widget.handle_key(&KeyInput::shift_tab()), KeyOutcome::Handled);
    let last = h.doc.active_element().unwrap();
    assert_ne!(first, last);
    assert_eq!(widget.handle_key(&KeyInput::tab()), KeyOutcome::Handled);
    assert_eq!(h.doc.active_element(), Some(first));
}

#[test]
fn test_dragged_position_restored_and_reclamped_on_small_viewport() {
    let durable = PersistentConfigStore::in_memory();
    let clock = ManualClock::new(0);

    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(durable.clone(), &clock));
    widget.mount(VIEWPORT);
    widget.pointer_down(Position::new(1230.0, 740.0));
    widget.pointer_move(Position::new(330.0, 240.0));
    let end = widget.pointer_up().unwrap();
    assert!(end.moved);
    drop(widget);

    let h = host();
    let mut widget = Widget::new(WidgetConfig::default(), h.doc, h.panel, context(durable, &clock));
    widget.mount(VIEWPORT);
    assert_eq!(widget.position().offset(), end.offset);

    let small = Size::new(400.0, 300.0);
    widget.resize(small);
    let origin = widget.position().absolute_position().unwrap();
    assert!(origin.x >= 0.0 && origin.x + 56.0 <= small.width);
    assert!(origin.y >= 0.0 && origin.y + 56.0 <= small.height);
}
