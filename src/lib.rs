// storybook_engine: MeKu Storybook Rust/WASM engine
// Story playback, tap reactions and the page builder model live here. JS renders and plays audio.

mod audio;
mod book;
mod builder;
mod error;
mod layout;
mod player;
mod project;
mod reaction;
mod story;
mod store;
mod timeline;
mod types;
mod visibility;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use wasm_bindgen::prelude::*;

pub use audio::{deliver_audio, AudioCue, AudioKind, AudioSink};
pub use book::*;
pub use builder::{
    ActionLog, BuilderAction, BuilderSnapshot, BuilderState, LoggedAction, PageUpdate, PanelUpdate,
    SettingsPatch, SidebarTab, ViewMode, BUILDER_STORAGE_KEY,
};
pub use error::StoryError;
pub use layout::{panels_for, LayoutPreset};
pub use player::{PageFrame, PlayerKey, PlayerOutput, StoryPlayer};
pub use project::{
    export_filename, ProjectData, ProjectDraft, ProjectExport, ProjectLibrary, ProjectSettings,
    PROJECTS_STORAGE_KEY,
};
pub use reaction::{
    glyph_for, particle_kind_for, Particle, ParticleBurst, ReactionView, TapOutcome, TapReactor,
    TapSource,
};
pub use story::*;
pub use store::{load_json, save_json, KeyValueStore, MemoryStore};
pub use timeline::{
    dispatch_signals, Schedule, Timeline, TimelineHandler, TimelineSignal, TimelineSnapshot,
    TimelineState,
};
pub use types::*;
pub use visibility::{
    animation_class, hotspot_view, image_view, should_show, text_view, ElementKind, ElementView,
    HotspotView,
};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn to_js_error(err: StoryError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Host wall clock, for stamping edits.
fn host_now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64).unwrap_or_default()
}

fn millis_to_datetime(now_ms: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_ms as i64).unwrap_or_default()
}

/// JSON accepted by `WasmTimeline::new()`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineConfig {
    /// Seconds.
    pub duration: f64,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
}

/// A standalone timeline. `tick` and `seek` return JSON arrays of signals.
#[wasm_bindgen]
pub struct WasmTimeline {
    inner: Timeline,
}

#[wasm_bindgen]
impl WasmTimeline {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmTimeline, JsValue> {
        let config: TimelineConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid timeline config: {}", e)))?;
        let inner = Timeline::checked(Timestamp::from_secs_f64(config.duration), config.events)
            .map_err(to_js_error)?;
        Ok(WasmTimeline { inner })
    }

    /// Advance to host frame time `now_ms` (e.g. the `requestAnimationFrame` argument).
    pub fn tick(&mut self, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.inner.tick(Timestamp::from_millis_f64(now_ms)))
    }

    pub fn seek(&mut self, seconds: f64) -> Result<String, JsValue> {
        to_json(&self.inner.seek(Timestamp::from_secs_f64(seconds)))
    }

    pub fn play(&mut self) {
        self.inner.play();
    }

    pub fn pause(&mut self) {
        self.inner.pause();
    }

    pub fn toggle(&mut self) {
        self.inner.toggle();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn set_duration(&mut self, seconds: f64) {
        self.inner.set_duration(Timestamp::from_secs_f64(seconds));
    }

    pub fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    /// Seconds.
    pub fn current_time(&self) -> f64 {
        self.inner.current_time().as_secs()
    }

    /// Seconds.
    pub fn duration(&self) -> f64 {
        self.inner.duration().as_secs()
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress()
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.snapshot())
    }
}

/// Whole-book player. Every mutating call returns a JSON array of `PlayerOutput`.
#[wasm_bindgen]
pub struct WasmStoryPlayer {
    inner: StoryPlayer,
}

#[wasm_bindgen]
impl WasmStoryPlayer {
    #[wasm_bindgen(constructor)]
    pub fn new(book_json: &str, config_json: &str) -> Result<WasmStoryPlayer, JsValue> {
        let book = StoryBook::from_json(book_json).map_err(to_js_error)?;
        Self::with_book(book, config_json)
    }

    /// Player over the bundled demo story.
    pub fn demo(config_json: &str) -> Result<WasmStoryPlayer, JsValue> {
        let book = demo_story().map_err(to_js_error)?;
        Self::with_book(book, config_json)
    }

    pub fn tick(&mut self, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.inner.tick(Timestamp::from_millis_f64(now_ms)))
    }

    pub fn seek(&mut self, seconds: f64) -> Result<String, JsValue> {
        to_json(&self.inner.seek(Timestamp::from_secs_f64(seconds)))
    }

    pub fn play(&mut self) {
        self.inner.play();
    }

    pub fn pause(&mut self) {
        self.inner.pause();
    }

    pub fn toggle(&mut self) {
        self.inner.toggle();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn next_page(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.next_page())
    }

    pub fn prev_page(&mut self) -> Result<String, JsValue> {
        to_json(&self.inner.prev_page())
    }

    pub fn go_to_page(&mut self, index: usize) -> Result<String, JsValue> {
        to_json(&self.inner.go_to_page(index))
    }

    /// DOM `KeyboardEvent.key`.
    pub fn key(&mut self, key: &str) -> Result<String, JsValue> {
        to_json(&self.inner.key(PlayerKey::from_dom_key(key)))
    }

    pub fn tap(&mut self, element_id: &str, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.inner.tap(element_id, Timestamp::from_millis_f64(now_ms)))
    }

    pub fn mark_image_loaded(&mut self, image_id: &str) {
        self.inner.mark_image_loaded(image_id);
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.inner.set_editing(editing);
    }

    pub fn current_page_index(&self) -> usize {
        self.inner.current_page_index()
    }

    pub fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    pub fn frame_json(&self, now_ms: f64) -> Result<String, JsValue> {
        to_json(&self.inner.frame(Timestamp::from_millis_f64(now_ms)))
    }
}

impl WasmStoryPlayer {
    fn with_book(book: StoryBook, config_json: &str) -> Result<WasmStoryPlayer, JsValue> {
        let config: PlayerConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;
        let inner = StoryPlayer::new(book, config).map_err(to_js_error)?;
        Ok(WasmStoryPlayer { inner })
    }
}

/// Page builder editor. Applied actions are kept in an action log.
#[wasm_bindgen]
#[derive(Default)]
pub struct WasmPageBuilder {
    state: BuilderState,
    log: ActionLog,
}

#[wasm_bindgen]
impl WasmPageBuilder {
    /// Start from persisted snapshot JSON (the `meku-page-builder` value), if any.
    /// Unreadable snapshots start a fresh editor.
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot_json: Option<String>) -> WasmPageBuilder {
        match snapshot_json
            .as_deref()
            .map(|raw| serde_json::from_str::<BuilderSnapshot>(raw)) {
            Some(Ok(snapshot)) => WasmPageBuilder {
                state: BuilderState::from_snapshot(snapshot.clone()),
                log: ActionLog::from_base(snapshot),
            },
            Some(Err(err)) => {
                warn!(error = %err, "discarding unreadable page builder snapshot");
                WasmPageBuilder::default()
            }
            None => WasmPageBuilder::default(),
        }
    }

    /// Apply an action stamped with the host clock.
    pub fn apply(&mut self, action_json: &str) -> Result<(), JsValue> {
        self.apply_action(action_json, host_now())
    }

    /// Apply an action at an explicit time (milliseconds since the epoch).
    pub fn apply_at(&mut self, action_json: &str, now_ms: f64) -> Result<(), JsValue> {
        self.apply_action(action_json, millis_to_datetime(now_ms))
    }

    /// Persisted subset of the state, ready for local storage.
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        to_json(&self.state.snapshot())
    }

    pub fn action_log_json(&self) -> Result<String, JsValue> {
        to_json(&self.log)
    }

    pub fn book_json(&self) -> Result<String, JsValue> {
        to_json(&self.state.book)
    }

    pub fn current_page_json(&self) -> Result<String, JsValue> {
        to_json(&self.state.current_page())
    }

    pub fn selected_panel_json(&self) -> Result<String, JsValue> {
        to_json(&self.state.selected_panel())
    }

    pub fn current_page_index(&self) -> usize {
        self.state.current_page_index
    }

    pub fn total_pages(&self) -> usize {
        self.state.total_pages()
    }

    pub fn zoom(&self) -> i32 {
        self.state.zoom
    }

    pub fn show_grid(&self) -> bool {
        self.state.show_grid
    }

    pub fn ai_panel_open(&self) -> bool {
        self.state.ai_panel_open
    }

    pub fn writing_studio_open(&self) -> bool {
        self.state.writing_studio_open
    }
}

impl WasmPageBuilder {
    fn apply_action(&mut self, action_json: &str, at: DateTime<Utc>) -> Result<(), JsValue> {
        let action: BuilderAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action: {}", e)))?;
        self.log.record(&mut self.state, action, at).map_err(to_js_error)
    }
}

/// Project library over a value the host keeps in local storage.
#[wasm_bindgen]
pub struct WasmProjectLibrary {
    inner: ProjectLibrary<MemoryStore>,
}

#[wasm_bindgen]
impl WasmProjectLibrary {
    /// `stored` is the current `graphic-novel-projects` value, if any.
    #[wasm_bindgen(constructor)]
    pub fn new(stored: Option<String>) -> WasmProjectLibrary {
        let mut store = MemoryStore::new();
        if let Some(raw) = stored {
            // MemoryStore writes cannot fail.
            let _ = store.set(PROJECTS_STORAGE_KEY, raw);
        }
        WasmProjectLibrary {
            inner: ProjectLibrary::load(store),
        }
    }

    pub fn list_json(&self) -> Result<String, JsValue> {
        to_json(self.inner.list())
    }

    pub fn save(&mut self, name: &str, draft_json: &str, save_as: bool) -> Result<String, JsValue> {
        let draft: ProjectDraft = serde_json::from_str(draft_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid project: {}", e)))?;
        let saved = self
            .inner
            .save(name, draft, save_as, host_now())
            .map_err(to_js_error)?;
        to_json(&saved)
    }

    pub fn duplicate(&mut self, id: &str) -> Result<String, JsValue> {
        let copy = self.inner.duplicate(id, host_now()).map_err(to_js_error)?;
        to_json(&copy)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), JsValue> {
        self.inner.delete(id).map_err(to_js_error)
    }

    /// `{ filename, json }` for a download link.
    pub fn export(&self, id: &str) -> Result<String, JsValue> {
        let export = self.inner.export(id).map_err(to_js_error)?;
        to_json(&export)
    }

    pub fn import(&mut self, json: &str) -> Result<String, JsValue> {
        let project = self.inner.import(json, host_now()).map_err(to_js_error)?;
        to_json(&project)
    }

    /// Value to write back to local storage after a change.
    pub fn storage_value(&self) -> Option<String> {
        self.inner
            .store()
            .get(PROJECTS_STORAGE_KEY)
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_fires_on_seek() {
        let config = r#"{
            "duration": 10,
            "events": [
                {"id":"a","time":2,"targetId":"x","action":{"type":"show"}},
                {"id":"b","time":5,"targetId":"y","action":{"type":"playSound","url":"ding.mp3"}}
            ]
        }"#;
        let mut timeline = WasmTimeline::new(config).unwrap();
        let signals: serde_json::Value = serde_json::from_str(&timeline.seek(7.0).unwrap()).unwrap();
        let ids: Vec<&str> = signals
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(signals[0]["type"], "eventFired");
        assert_eq!(signals[1]["action"]["url"], "ding.mp3");
        assert_eq!(timeline.current_time(), 7.0);
    }

    #[test]
    fn timeline_completes_through_ticks() {
        let mut timeline = WasmTimeline::new(r#"{"duration": 1}"#).unwrap();
        timeline.play();
        assert_eq!(timeline.tick(16.0).unwrap(), "[]");
        assert_eq!(timeline.tick(2000.0).unwrap(), r#"[{"type":"completed"}]"#);
        assert!(!timeline.is_playing());
        assert_eq!(timeline.progress(), 100.0);
    }

    #[test]
    fn demo_player_renders_frames() {
        let mut player = WasmStoryPlayer::demo("{}").unwrap();
        assert_eq!(player.page_count(), 4);
        player.tick(0.0).unwrap();
        player.tick(100.0).unwrap();
        let outputs = player.tick(700.0).unwrap();
        assert!(outputs.contains(r#""eventId":"e1""#));

        let frame: serde_json::Value =
            serde_json::from_str(&player.frame_json(700.0).unwrap()).unwrap();
        assert_eq!(frame["isPlaying"], true);
        assert_eq!(frame["timeLabel"], "0:00 / 0:08");
        assert_eq!(frame["elements"][0]["shown"], true);

        let outputs = player.key("ArrowRight").unwrap();
        assert_eq!(outputs, r#"[{"type":"pageChanged","index":1}]"#);
    }

    #[test]
    fn page_builder_applies_and_snapshots() {
        let mut builder = WasmPageBuilder::new(None);
        builder
            .apply_at(
                r#"{"type":"createBook","title":"Owl Night","author":"Kit"}"#,
                1_735_689_600_000.0,
            )
            .unwrap();
        builder
            .apply_at(r#"{"type":"addPage"}"#, 1_735_689_601_000.0)
            .unwrap();
        builder
            .apply_at(r#"{"type":"setZoom","zoom":300}"#, 1_735_689_602_000.0)
            .unwrap();
        assert_eq!(builder.total_pages(), 2);
        assert_eq!(builder.zoom(), 200);

        let snapshot = builder.snapshot_json().unwrap();
        assert!(snapshot.contains(r#""title":"Owl Night""#));
        let log: ActionLog = serde_json::from_str(&builder.action_log_json().unwrap()).unwrap();
        assert_eq!(log.len(), 3);

        let mut restored = WasmPageBuilder::new(Some(snapshot));
        assert_eq!(restored.total_pages(), 2);
        assert_eq!(restored.zoom(), 200);

        restored
            .apply_at(r#"{"type":"addPage"}"#, 1_735_689_601_000.0)
            .unwrap();
        let log: ActionLog = serde_json::from_str(&restored.action_log_json().unwrap()).unwrap();
        assert_eq!(log.len(), 1);
        let replayed = log.replay().unwrap();
        assert_eq!(replayed.total_pages(), 3);
        assert_eq!(replayed.book, restored.state.book);
    }

    #[test]
    fn unreadable_snapshot_starts_fresh() {
        let builder = WasmPageBuilder::new(Some("{".to_string()));
        assert_eq!(builder.total_pages(), 0);
        assert_eq!(builder.zoom(), 100);
    }

    #[test]
    fn project_library_reads_stored_value() {
        let stored = r#"[{"id":"project_1_0","name":"Comet","pages":[],"characters":[],"images":[],
            "settings":{"gutter":8,"pageSize":"a4","orientation":"portrait"},
            "createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z","version":3}]"#;
        let library = WasmProjectLibrary::new(Some(stored.to_string()));
        let list: Vec<ProjectData> = serde_json::from_str(&library.list_json().unwrap()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].version, 3);
        let export: serde_json::Value =
            serde_json::from_str(&library.export("project_1_0").unwrap()).unwrap();
        assert_eq!(export["filename"], "Comet.json");
        assert_eq!(library.storage_value().as_deref(), Some(stored));
    }
}
