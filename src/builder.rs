// Page builder state. Editor state is a plain value changed only through
// `BuilderState::apply`; an `ActionLog` of timestamped actions replays to the
// same state, ids included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::book::{
    Book, BookPage, BookSettings, LibraryImage, NewLibraryImage, Orientation, PageNarration,
    PageSize, Panel, PanelAnimation, PanelContent, SourceText,
};
use crate::error::StoryError;
use crate::layout::{panels_for, LayoutPreset};
use crate::store::{load_json, save_json, KeyValueStore};
use crate::types::Bounds;

/// Storage key for persisted editor state.
pub const BUILDER_STORAGE_KEY: &str = "meku-page-builder";
pub const SNAPSHOT_VERSION: u32 = 1;
pub const ACTION_LOG_VERSION: u32 = 1;

pub const MIN_ZOOM: i32 = 25;
pub const MAX_ZOOM: i32 = 200;

const DEFAULT_BACKGROUND: &str = "#ffffff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Single,
    /// Two-page book spread.
    Spread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SidebarTab {
    #[default]
    Layouts,
    Images,
    Text,
    Settings,
}

/// Partial update of book settings. Absent fields are left alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub default_orientation: Option<Orientation>,
    pub page_size: Option<PageSize>,
    pub reading_level: Option<String>,
    pub language: Option<String>,
}

impl SettingsPatch {
    fn apply_to(self, settings: &mut BookSettings) {
        if let Some(v) = self.default_orientation {
            settings.default_orientation = v;
        }
        if let Some(v) = self.page_size {
            settings.page_size = v;
        }
        if let Some(v) = self.reading_level {
            settings.reading_level = Some(v);
        }
        if let Some(v) = self.language {
            settings.language = v;
        }
    }
}

/// Partial update of a page's own fields. Layout and panels have their own actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PageUpdate {
    pub orientation: Option<Orientation>,
    pub background_color: Option<String>,
    pub background_image: Option<String>,
    pub narration: Option<PageNarration>,
    pub notes: Option<String>,
}

impl PageUpdate {
    fn apply_to(self, page: &mut BookPage) {
        if let Some(v) = self.orientation {
            page.orientation = v;
        }
        if let Some(v) = self.background_color {
            page.background_color = v;
        }
        if let Some(v) = self.background_image {
            page.background_image = Some(v);
        }
        if let Some(v) = self.narration {
            page.narration = Some(v);
        }
        if let Some(v) = self.notes {
            page.notes = Some(v);
        }
    }
}

/// Partial update of a panel's geometry and playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelUpdate {
    pub bounds: Option<Bounds>,
    pub z_index: Option<i32>,
    pub animation: Option<PanelAnimation>,
}

impl PanelUpdate {
    fn apply_to(self, panel: &mut Panel) {
        if let Some(v) = self.bounds {
            panel.bounds = v;
        }
        if let Some(v) = self.z_index {
            panel.z_index = v;
        }
        if let Some(v) = self.animation {
            panel.animation = Some(v);
        }
    }
}

/// Every state transition of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BuilderAction {
    // Book
    CreateBook {
        title: String,
        author: String,
    },
    LoadBook {
        book: Box<Book>,
    },
    UpdateBookSettings {
        settings: SettingsPatch,
    },
    SetSourceText {
        text: String,
    },

    // Pages
    AddPage {
        #[serde(default)]
        after: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    DeletePage {
        page_index: usize,
    },
    #[serde(rename_all = "camelCase")]
    DuplicatePage {
        page_index: usize,
    },
    ReorderPages {
        from: usize,
        to: usize,
    },
    SetCurrentPage {
        index: usize,
    },
    #[serde(rename_all = "camelCase")]
    UpdatePage {
        page_index: usize,
        updates: PageUpdate,
    },

    // Layout
    #[serde(rename_all = "camelCase")]
    SetPageLayout {
        page_index: usize,
        layout: LayoutPreset,
    },
    #[serde(rename_all = "camelCase")]
    SetPageOrientation {
        page_index: usize,
        orientation: Orientation,
    },

    // Panels
    #[serde(rename_all = "camelCase")]
    SelectPanel {
        panel_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdatePanel {
        page_index: usize,
        panel_id: String,
        updates: PanelUpdate,
    },
    #[serde(rename_all = "camelCase")]
    SetPanelContent {
        page_index: usize,
        panel_id: String,
        content: Option<PanelContent>,
    },
    #[serde(rename_all = "camelCase")]
    AddTextToPanel {
        page_index: usize,
        panel_id: String,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    AddImageToPanel {
        page_index: usize,
        panel_id: String,
        src: String,
    },
    #[serde(rename_all = "camelCase")]
    ClearPanel {
        page_index: usize,
        panel_id: String,
    },

    // Narration
    #[serde(rename_all = "camelCase")]
    SetPageNarration {
        page_index: usize,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    SetPageAudio {
        page_index: usize,
        audio_url: String,
    },

    // Image library
    AddToLibrary {
        image: NewLibraryImage,
    },
    #[serde(rename_all = "camelCase")]
    RemoveFromLibrary {
        image_id: String,
    },

    // UI
    SetViewMode {
        mode: ViewMode,
    },
    SetZoom {
        zoom: i32,
    },
    ToggleGrid,
    SetSidebarTab {
        tab: SidebarTab,
    },
    ToggleAiPanel,
    ToggleWritingStudio,

    // Navigation
    NextPage,
    PrevPage,
    /// One-based page number. Out-of-range numbers are ignored.
    #[serde(rename_all = "camelCase")]
    GoToPage {
        page_number: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuilderState {
    pub book: Option<Book>,
    pub current_page_index: usize,
    pub selected_panel_id: Option<String>,
    pub view_mode: ViewMode,
    pub zoom: i32,
    pub show_grid: bool,
    pub sidebar_tab: SidebarTab,
    pub ai_panel_open: bool,
    pub writing_studio_open: bool,
    pub image_library: Vec<LibraryImage>,
    /// Id counter. Part of the state so replays mint the same ids.
    next_id: u64,
}

impl Default for BuilderState {
    fn default() -> Self {
        BuilderState {
            book: None,
            current_page_index: 0,
            selected_panel_id: None,
            view_mode: ViewMode::Single,
            zoom: 100,
            show_grid: false,
            sidebar_tab: SidebarTab::Layouts,
            ai_panel_open: false,
            writing_studio_open: false,
            image_library: Vec::new(),
            next_id: 0,
        }
    }
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn current_page(&self) -> Option<&BookPage> {
        self.book.as_ref()?.pages.get(self.current_page_index)
    }

    pub fn selected_panel(&self) -> Option<&Panel> {
        let id = self.selected_panel_id.as_deref()?;
        self.current_page()?.panel(id)
    }

    pub fn total_pages(&self) -> usize {
        self.book.as_ref().map_or(0, |b| b.pages.len())
    }

    // -------------------------------------------------------------------------
    // Reducer
    // -------------------------------------------------------------------------

    /// Apply one action. `at` is the wall-clock time of the action; it stamps
    /// book edits and seeds generated ids.
    pub fn apply(&mut self, action: BuilderAction, at: DateTime<Utc>) -> Result<(), StoryError> {
        match action {
            BuilderAction::CreateBook { title, author } => {
                let book_id = self.generate_id(at);
                let first_page = self.new_page(at, 1, Orientation::Portrait);
                self.book = Some(Book {
                    id: book_id,
                    title,
                    author,
                    description: None,
                    cover_image: None,
                    created_at: at,
                    updated_at: at,
                    settings: BookSettings::default(),
                    pages: vec![first_page],
                    source_text: None,
                });
                self.current_page_index = 0;
                self.selected_panel_id = None;
            }
            BuilderAction::LoadBook { book } => {
                self.book = Some(*book);
                self.current_page_index = 0;
                self.selected_panel_id = None;
            }
            BuilderAction::UpdateBookSettings { settings } => {
                let book = self.book_mut()?;
                settings.apply_to(&mut book.settings);
                book.updated_at = at;
            }
            BuilderAction::SetSourceText { text } => {
                let book = self.book_mut()?;
                book.source_text = Some(SourceText {
                    full_text: text,
                    chapters: None,
                });
                book.updated_at = at;
            }

            BuilderAction::AddPage { after } => {
                let (len, orientation) = {
                    let book = self.book_ref()?;
                    (book.pages.len(), book.settings.default_orientation)
                };
                let insert_at = match after {
                    Some(index) if index >= len => {
                        return Err(StoryError::PageOutOfRange { index, len })
                    }
                    Some(index) => index + 1,
                    None => len,
                };
                let page = self.new_page(at, insert_at as u32 + 1, orientation);
                let book = self.book_mut()?;
                book.pages.insert(insert_at, page);
                book.renumber_pages();
                book.updated_at = at;
                self.current_page_index = insert_at;
            }
            BuilderAction::DeletePage { page_index } => {
                let book = self.book_mut()?;
                check_page(book, page_index)?;
                if book.pages.len() <= 1 {
                    debug!("refusing to delete the only page");
                    return Ok(());
                }
                book.pages.remove(page_index);
                book.renumber_pages();
                book.updated_at = at;
                let last = book.pages.len() - 1;
                self.current_page_index = self.current_page_index.min(last);
                self.selected_panel_id = None;
            }
            BuilderAction::DuplicatePage { page_index } => {
                let mut copy = {
                    let book = self.book_ref()?;
                    check_page(book, page_index)?;
                    book.pages[page_index].clone()
                };
                copy.id = self.generate_id(at);
                for panel in &mut copy.panels {
                    panel.id = self.generate_id(at);
                }
                let book = self.book_mut()?;
                book.pages.insert(page_index + 1, copy);
                book.renumber_pages();
                book.updated_at = at;
                self.current_page_index = page_index + 1;
            }
            BuilderAction::ReorderPages { from, to } => {
                let book = self.book_mut()?;
                check_page(book, from)?;
                check_page(book, to)?;
                let page = book.pages.remove(from);
                book.pages.insert(to, page);
                book.renumber_pages();
                book.updated_at = at;
            }
            BuilderAction::SetCurrentPage { index } => {
                let len = self.book_ref()?.pages.len();
                self.current_page_index = index.min(len.saturating_sub(1));
                self.selected_panel_id = None;
            }
            BuilderAction::UpdatePage { page_index, updates } => {
                let page = self.page_mut(page_index, at)?;
                updates.apply_to(page);
            }

            BuilderAction::SetPageLayout { page_index, layout } => {
                check_page(self.book_ref()?, page_index)?;
                let panels = panels_for(layout, || self.generate_id(at));
                let page = self.page_mut(page_index, at)?;
                page.layout = layout;
                page.panels = panels;
                self.selected_panel_id = None;
            }
            BuilderAction::SetPageOrientation {
                page_index,
                orientation,
            } => {
                self.page_mut(page_index, at)?.orientation = orientation;
            }

            BuilderAction::SelectPanel { panel_id } => {
                self.selected_panel_id = panel_id;
            }
            BuilderAction::UpdatePanel {
                page_index,
                panel_id,
                updates,
            } => {
                updates.apply_to(self.panel_mut(page_index, &panel_id, at)?);
            }
            BuilderAction::SetPanelContent {
                page_index,
                panel_id,
                content,
            } => {
                self.panel_mut(page_index, &panel_id, at)?.content = content;
            }
            BuilderAction::AddTextToPanel {
                page_index,
                panel_id,
                text,
            } => {
                self.panel_mut(page_index, &panel_id, at)?.content = Some(PanelContent::text(text));
            }
            BuilderAction::AddImageToPanel {
                page_index,
                panel_id,
                src,
            } => {
                self.panel_mut(page_index, &panel_id, at)?.content = Some(PanelContent::image(src));
            }
            BuilderAction::ClearPanel {
                page_index,
                panel_id,
            } => {
                self.panel_mut(page_index, &panel_id, at)?.content = None;
            }

            BuilderAction::SetPageNarration { page_index, text } => {
                let page = self.page_mut(page_index, at)?;
                page.narration.get_or_insert_with(PageNarration::default).text = text;
            }
            BuilderAction::SetPageAudio {
                page_index,
                audio_url,
            } => {
                let page = self.page_mut(page_index, at)?;
                page.narration.get_or_insert_with(PageNarration::default).audio_url = Some(audio_url);
            }

            BuilderAction::AddToLibrary { image } => {
                let id = self.generate_id(at);
                self.image_library.push(LibraryImage {
                    id,
                    src: image.src,
                    filename: image.filename,
                    uploaded_at: at,
                    tags: image.tags,
                    variants: image.variants,
                });
            }
            BuilderAction::RemoveFromLibrary { image_id } => {
                self.image_library.retain(|img| img.id != image_id);
            }

            BuilderAction::SetViewMode { mode } => self.view_mode = mode,
            BuilderAction::SetZoom { zoom } => self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            BuilderAction::ToggleGrid => self.show_grid = !self.show_grid,
            BuilderAction::SetSidebarTab { tab } => self.sidebar_tab = tab,
            BuilderAction::ToggleAiPanel => self.ai_panel_open = !self.ai_panel_open,
            BuilderAction::ToggleWritingStudio => {
                self.writing_studio_open = !self.writing_studio_open
            }

            BuilderAction::NextPage => {
                let len = self.book_ref()?.pages.len();
                if self.current_page_index + 1 < len {
                    self.current_page_index += 1;
                    self.selected_panel_id = None;
                }
            }
            BuilderAction::PrevPage => {
                if self.current_page_index > 0 {
                    self.current_page_index -= 1;
                    self.selected_panel_id = None;
                }
            }
            BuilderAction::GoToPage { page_number } => {
                let len = self.book_ref()?.pages.len();
                if (1..=len).contains(&page_number) {
                    self.current_page_index = page_number - 1;
                    self.selected_panel_id = None;
                }
            }
        }
        Ok(())
    }

    fn generate_id(&mut self, at: DateTime<Utc>) -> String {
        self.next_id += 1;
        format!("{}-{}", at.timestamp_millis(), self.next_id)
    }

    fn new_page(&mut self, at: DateTime<Utc>, page_number: u32, orientation: Orientation) -> BookPage {
        let id = self.generate_id(at);
        let panels = panels_for(LayoutPreset::Full, || self.generate_id(at));
        BookPage {
            id,
            page_number,
            orientation,
            layout: LayoutPreset::Full,
            panels,
            background_color: DEFAULT_BACKGROUND.to_string(),
            background_image: None,
            narration: None,
            notes: None,
        }
    }

    fn book_ref(&self) -> Result<&Book, StoryError> {
        self.book.as_ref().ok_or(StoryError::NoBook)
    }

    fn book_mut(&mut self) -> Result<&mut Book, StoryError> {
        self.book.as_mut().ok_or(StoryError::NoBook)
    }

    /// Mutable page access. Stamps the book as edited.
    fn page_mut(&mut self, page_index: usize, at: DateTime<Utc>) -> Result<&mut BookPage, StoryError> {
        let book = self.book_mut()?;
        check_page(book, page_index)?;
        book.updated_at = at;
        Ok(&mut book.pages[page_index])
    }

    fn panel_mut(
        &mut self,
        page_index: usize,
        panel_id: &str,
        at: DateTime<Utc>,
    ) -> Result<&mut Panel, StoryError> {
        let book = self.book_mut()?;
        check_page(book, page_index)?;
        let page = &mut book.pages[page_index];
        let panel = page
            .panel_mut(panel_id)
            .ok_or_else(|| StoryError::PanelNotFound(panel_id.to_string()))?;
        book.updated_at = at;
        Ok(panel)
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// The persisted subset of the state.
    pub fn snapshot(&self) -> BuilderSnapshot {
        BuilderSnapshot {
            version: SNAPSHOT_VERSION,
            current_book: self.book.clone(),
            image_library: self.image_library.clone(),
            view_mode: self.view_mode,
            zoom: self.zoom,
            show_grid: self.show_grid,
            next_id: self.next_id,
        }
    }

    /// Rebuild from a snapshot. Snapshots from another version yield a fresh state.
    pub fn from_snapshot(snapshot: BuilderSnapshot) -> Self {
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                found = snapshot.version,
                expected = SNAPSHOT_VERSION,
                "ignoring page builder snapshot from another version"
            );
            return Self::default();
        }
        let next_id = snapshot
            .next_id
            .max(highest_id_counter(snapshot.current_book.as_ref(), &snapshot.image_library));
        BuilderState {
            book: snapshot.current_book,
            image_library: snapshot.image_library,
            view_mode: snapshot.view_mode,
            zoom: snapshot.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            show_grid: snapshot.show_grid,
            next_id,
            ..Self::default()
        }
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoryError> {
        save_json(store, BUILDER_STORAGE_KEY, &self.snapshot())
    }

    /// Load persisted state. Missing or unreadable state starts fresh.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match load_json::<BuilderSnapshot, _>(store, BUILDER_STORAGE_KEY) {
            Ok(Some(snapshot)) => Self::from_snapshot(snapshot),
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(error = %err, "failed to load page builder state");
                Self::default()
            }
        }
    }
}

/// Largest `<millis>-<n>` counter among existing ids, so restored editors
/// never mint an id that is already taken.
fn highest_id_counter(book: Option<&Book>, library: &[LibraryImage]) -> u64 {
    let counter = |id: &str| {
        id.rsplit_once('-')
            .and_then(|(_, n)| n.parse::<u64>().ok())
            .unwrap_or(0)
    };
    let book_ids = book.into_iter().flat_map(|book| {
        std::iter::once(book.id.as_str()).chain(book.pages.iter().flat_map(|page| {
            std::iter::once(page.id.as_str()).chain(page.panels.iter().map(|p| p.id.as_str()))
        }))
    });
    book_ids
        .chain(library.iter().map(|image| image.id.as_str()))
        .map(counter)
        .max()
        .unwrap_or(0)
}

fn check_page(book: &Book, index: usize) -> Result<(), StoryError> {
    let len = book.pages.len();
    if index >= len {
        return Err(StoryError::PageOutOfRange { index, len });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSnapshot {
    pub version: u32,
    pub current_book: Option<Book>,
    #[serde(default)]
    pub image_library: Vec<LibraryImage>,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default = "default_zoom")]
    pub zoom: i32,
    #[serde(default)]
    pub show_grid: bool,
    #[serde(default)]
    pub next_id: u64,
}

fn default_zoom() -> i32 {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub action: BuilderAction,
}

/// Ordered record of applied actions, optionally on top of a restored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<BuilderSnapshot>,
    pub entries: Vec<LoggedAction>,
}

impl Default for ActionLog {
    fn default() -> Self {
        ActionLog {
            version: ACTION_LOG_VERSION,
            base: None,
            entries: Vec::new(),
        }
    }
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log for an editor restored from `base`.
    pub fn from_base(base: BuilderSnapshot) -> Self {
        ActionLog {
            base: Some(base),
            ..Self::default()
        }
    }

    /// Apply `action` to `state` and log it. Rejected actions are not logged.
    pub fn record(
        &mut self,
        state: &mut BuilderState,
        action: BuilderAction,
        at: DateTime<Utc>,
    ) -> Result<(), StoryError> {
        state.apply(action.clone(), at)?;
        let seq = self.entries.last().map_or(0, |e| e.seq + 1);
        self.entries.push(LoggedAction { seq, at, action });
        Ok(())
    }

    /// Rebuild the state from the base snapshot, or an empty editor without one.
    pub fn replay(&self) -> Result<BuilderState, StoryError> {
        if self.version != ACTION_LOG_VERSION {
            return Err(StoryError::InvalidConfig(format!(
                "unsupported action log version {}",
                self.version
            )));
        }
        let mut state = self
            .base
            .clone()
            .map_or_else(BuilderState::default, BuilderState::from_snapshot);
        for entry in &self.entries {
            state.apply(entry.action.clone(), entry.at)?;
        }
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
