// Story player: page navigation, per-page timeline playback, event dispatch, and taps.
// Output is a batch of PlayerOutput values per call; the host renders and plays audio.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::audio::AudioCue;
use crate::error::StoryError;
use crate::reaction::{TapReactor, TapSource};
use crate::story::{EventAction, ParticleKind, StoryBook, StoryPage, TapReactionType};
use crate::timeline::{Timeline, TimelineSignal};
use crate::types::{format_clock, PlayerConfig, Timestamp};
use crate::visibility::{hotspot_view, image_view, text_view, ElementView, HotspotView};

/// Keyboard input the player understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    Next,
    Previous,
    Close,
    Other,
}

impl PlayerKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_dom_key(key: &str) -> Self {
        match key {
            "ArrowRight" | " " => PlayerKey::Next,
            "ArrowLeft" => PlayerKey::Previous,
            "Escape" => PlayerKey::Close,
            _ => PlayerKey::Other,
        }
    }
}

/// Something the host should act on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerOutput {
    #[serde(rename_all = "camelCase")]
    EventTriggered { event_id: String, target_id: String },
    Audio(AudioCue),
    #[serde(rename_all = "camelCase")]
    Reaction {
        element_id: String,
        reaction: TapReactionType,
        particle_kind: ParticleKind,
    },
    PageChanged { index: usize },
    PageComplete { index: usize },
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Autoplay {
    Idle,
    /// Page activated; the delay starts at the next clock reading.
    Armed,
    StartAt(Timestamp),
}

/// Render model for the active page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFrame {
    pub page_index: usize,
    pub page_number: u32,
    pub page_count: usize,
    pub is_first_page: bool,
    pub is_last_page: bool,
    pub is_playing: bool,
    /// Seconds.
    pub current_time: f64,
    /// Seconds.
    pub duration: f64,
    pub progress: f64,
    /// `M:SS / M:SS`
    pub time_label: String,
    pub background_css: String,
    pub elements: Vec<ElementView>,
    pub hotspots: Vec<HotspotView>,
}

pub struct StoryPlayer {
    book: StoryBook,
    config: PlayerConfig,
    current_page: usize,
    timeline: Timeline,
    reactor: TapReactor,
    loaded_images: HashSet<String>,
    autoplay: Autoplay,
    editing: bool,
}

impl StoryPlayer {
    pub fn new(book: StoryBook, config: PlayerConfig) -> Result<Self, StoryError> {
        book.validate()?;
        let current_page = config.start_page.min(book.pages.len() - 1);
        let timeline = Timeline::for_page(&book.pages[current_page]);
        let reactor = TapReactor::new(config.reactions.clone());

        let mut player = StoryPlayer {
            book,
            config,
            current_page,
            timeline,
            reactor,
            loaded_images: HashSet::new(),
            autoplay: Autoplay::Idle,
            editing: false,
        };
        player.activate_page();
        Ok(player)
    }

    pub fn book(&self) -> &StoryBook {
        &self.book
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page
    }

    pub fn current_page(&self) -> &StoryPage {
        &self.book.pages[self.current_page]
    }

    pub fn page_count(&self) -> usize {
        self.book.pages.len()
    }

    pub fn is_first_page(&self) -> bool {
        self.current_page == 0
    }

    pub fn is_last_page(&self) -> bool {
        self.current_page + 1 == self.book.pages.len()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Show hotspot outlines (editor preview).
    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    // -------------------------------------------------------------------------
    // Playback controls. Manual control cancels a pending autoplay.
    // -------------------------------------------------------------------------

    pub fn play(&mut self) {
        self.autoplay = Autoplay::Idle;
        self.timeline.play();
    }

    pub fn pause(&mut self) {
        self.autoplay = Autoplay::Idle;
        self.timeline.pause();
    }

    pub fn toggle(&mut self) {
        self.autoplay = Autoplay::Idle;
        self.timeline.toggle();
    }

    pub fn reset(&mut self) {
        self.autoplay = Autoplay::Idle;
        self.timeline.reset();
    }

    pub fn seek(&mut self, target: Timestamp) -> Vec<PlayerOutput> {
        let signals = self.timeline.seek(target);
        self.handle_signals(signals)
    }

    /// Advance one animation frame.
    pub fn tick(&mut self, now: Timestamp) -> Vec<PlayerOutput> {
        self.reactor.prune(now);

        if self.autoplay == Autoplay::Armed {
            self.autoplay = Autoplay::StartAt(now.add_millis(self.config.autoplay_delay_ms));
        }
        if let Autoplay::StartAt(at) = self.autoplay {
            if now >= at {
                self.autoplay = Autoplay::Idle;
                self.timeline.play();
            }
        }

        let signals = self.timeline.tick(now);
        self.handle_signals(signals)
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    pub fn next_page(&mut self) -> Vec<PlayerOutput> {
        if self.is_last_page() {
            return Vec::new();
        }
        self.change_page(self.current_page + 1)
    }

    pub fn prev_page(&mut self) -> Vec<PlayerOutput> {
        if self.is_first_page() {
            return Vec::new();
        }
        self.change_page(self.current_page - 1)
    }

    /// Jump to a zero-based page index. Out-of-range and same-page jumps are ignored.
    pub fn go_to_page(&mut self, index: usize) -> Vec<PlayerOutput> {
        if index >= self.book.pages.len() || index == self.current_page {
            return Vec::new();
        }
        self.change_page(index)
    }

    pub fn key(&mut self, key: PlayerKey) -> Vec<PlayerOutput> {
        match key {
            PlayerKey::Next => self.next_page(),
            PlayerKey::Previous => self.prev_page(),
            PlayerKey::Close => vec![PlayerOutput::CloseRequested],
            PlayerKey::Other => Vec::new(),
        }
    }

    fn change_page(&mut self, index: usize) -> Vec<PlayerOutput> {
        self.deactivate_page();
        self.current_page = index;
        self.timeline = Timeline::for_page(&self.book.pages[index]);
        self.activate_page();
        debug!(page = index, "story page changed");
        vec![PlayerOutput::PageChanged { index }]
    }

    fn deactivate_page(&mut self) {
        self.timeline.pause();
        self.timeline.reset();
        self.autoplay = Autoplay::Idle;
    }

    fn activate_page(&mut self) {
        self.reactor.clear();
        self.loaded_images.clear();
        if self.config.auto_play {
            self.timeline.reset();
            self.autoplay = Autoplay::Armed;
        }
    }

    // -------------------------------------------------------------------------
    // Elements
    // -------------------------------------------------------------------------

    pub fn mark_image_loaded(&mut self, image_id: &str) {
        self.loaded_images.insert(image_id.to_string());
    }

    /// Tap an element or hotspot on the current page. Elements must be on
    /// screen and tappable; anything else is ignored.
    pub fn tap(&mut self, element_id: &str, now: Timestamp) -> Vec<PlayerOutput> {
        let page = &self.book.pages[self.current_page];
        let current_time = self.timeline.current_time();

        let target = if let Some(block) = page.text_blocks.iter().find(|b| b.id == element_id) {
            block
                .tappable
                .as_ref()
                .filter(|t| t.enabled && current_time >= block.animation.start())
                .map(|t| (t.reaction, t.sound.clone(), TapSource::Text))
        } else if let Some(image) = page.images.iter().find(|i| i.id == element_id) {
            image
                .tappable
                .as_ref()
                .filter(|t| {
                    t.enabled
                        && self.loaded_images.contains(&image.id)
                        && current_time >= image.animation.start()
                })
                .map(|t| (t.reaction, t.sound.clone(), TapSource::Image))
        } else {
            page.hotspots.iter().find(|h| h.id == element_id).map(|h| {
                (
                    h.reaction.animation,
                    h.reaction.sound.clone(),
                    TapSource::Hotspot(h.reaction.particle_effect),
                )
            })
        };

        let Some((reaction, sound, source)) = target else {
            return Vec::new();
        };

        let outcome = self
            .reactor
            .tap(element_id, reaction, sound.as_deref(), source, now);
        let mut outputs = vec![PlayerOutput::Reaction {
            element_id: outcome.element_id,
            reaction: outcome.reaction,
            particle_kind: outcome.particle_kind,
        }];
        if let Some(cue) = outcome.sound {
            outputs.push(PlayerOutput::Audio(cue));
        }
        outputs
    }

    /// Render model at host time `now`.
    pub fn frame(&self, now: Timestamp) -> PageFrame {
        let page = &self.book.pages[self.current_page];
        let current_time = self.timeline.current_time();

        let mut elements = Vec::with_capacity(page.text_blocks.len() + page.images.len());
        for block in &page.text_blocks {
            elements.push(text_view(
                block,
                true,
                current_time,
                self.reactor.view(&block.id, now),
            ));
        }
        for image in &page.images {
            elements.push(image_view(
                image,
                true,
                current_time,
                self.loaded_images.contains(&image.id),
                self.reactor.view(&image.id, now),
            ));
        }
        let hotspots = page
            .hotspots
            .iter()
            .map(|h| hotspot_view(h, self.editing, self.reactor.view(&h.id, now)))
            .collect();

        PageFrame {
            page_index: self.current_page,
            page_number: page.page_number,
            page_count: self.book.pages.len(),
            is_first_page: self.is_first_page(),
            is_last_page: self.is_last_page(),
            is_playing: self.timeline.is_playing(),
            current_time: current_time.as_secs(),
            duration: self.timeline.duration().as_secs(),
            progress: self.timeline.progress(),
            time_label: format!(
                "{} / {}",
                format_clock(current_time),
                format_clock(self.timeline.duration())
            ),
            background_css: page.background.css(),
            elements,
            hotspots,
        }
    }

    fn handle_signals(&mut self, signals: Vec<TimelineSignal>) -> Vec<PlayerOutput> {
        let mut outputs = Vec::new();
        let mut completed = false;

        let page = &self.book.pages[self.current_page];
        for signal in signals {
            match signal {
                TimelineSignal::EventFired(event) => {
                    outputs.push(PlayerOutput::EventTriggered {
                        event_id: event.id.clone(),
                        target_id: event.target_id.clone(),
                    });
                    match event.action {
                        EventAction::PlayNarration => {
                            if let Some(url) = page.narration_url() {
                                outputs.push(PlayerOutput::Audio(AudioCue::narration(url)));
                            }
                        }
                        EventAction::PlaySound { url } => {
                            outputs.push(PlayerOutput::Audio(AudioCue::sound(
                                url,
                                self.config.event_sound_volume,
                            )));
                        }
                        // Elements derive show/hide/animate from the playhead.
                        EventAction::Show { .. }
                        | EventAction::Hide { .. }
                        | EventAction::Animate { .. } => {}
                    }
                }
                TimelineSignal::Completed => {
                    debug!(page = self.current_page, "story page complete");
                    outputs.push(PlayerOutput::PageComplete {
                        index: self.current_page,
                    });
                    completed = true;
                }
            }
        }

        if completed && self.config.auto_advance {
            outputs.extend(self.next_page());
        }
        outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioKind;
    use crate::story::{demo_story, NarrationConfig, NarrationProvider, TimelineEvent};

    fn ms(v: u64) -> Timestamp {
        Timestamp::from_micros(v * 1000)
    }

    fn manual_config() -> PlayerConfig {
        PlayerConfig {
            auto_play: false,
            ..PlayerConfig::default()
        }
    }

    fn triggered(outputs: &[PlayerOutput]) -> Vec<String> {
        outputs
            .iter()
            .filter_map(|o| match o {
                PlayerOutput::EventTriggered { event_id, .. } => Some(event_id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn autoplay_waits_for_settle_delay() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), PlayerConfig::default()).unwrap();
        player.tick(ms(1000));
        assert!(!player.timeline().is_playing());
        player.tick(ms(1050));
        assert!(!player.timeline().is_playing());

        // Starts at 1100 and anchors the clock there.
        player.tick(ms(1100));
        assert!(player.timeline().is_playing());
        assert_eq!(player.timeline().current_time(), Timestamp::ZERO);

        let outputs = player.tick(ms(1600));
        assert_eq!(triggered(&outputs), vec!["e1"]);
    }

    #[test]
    fn manual_controls_cancel_pending_autoplay() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), PlayerConfig::default()).unwrap();
        player.pause();
        player.tick(ms(0));
        player.tick(ms(500));
        assert!(!player.timeline().is_playing());
    }

    #[test]
    fn navigation_respects_bounds() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), manual_config()).unwrap();
        assert!(player.prev_page().is_empty());
        assert_eq!(player.next_page(), vec![PlayerOutput::PageChanged { index: 1 }]);
        assert_eq!(player.go_to_page(3), vec![PlayerOutput::PageChanged { index: 3 }]);
        assert!(player.is_last_page());
        assert!(player.next_page().is_empty());
        assert!(player.go_to_page(9).is_empty());
        assert_eq!(
            player.key(PlayerKey::from_dom_key("ArrowLeft")),
            vec![PlayerOutput::PageChanged { index: 2 }]
        );
        assert_eq!(
            player.key(PlayerKey::from_dom_key("Escape")),
            vec![PlayerOutput::CloseRequested]
        );
        assert!(player.key(PlayerKey::from_dom_key("q")).is_empty());
    }

    #[test]
    fn leaving_a_page_resets_its_timeline() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), manual_config()).unwrap();
        player.seek(ms(4000));
        player.next_page();
        player.prev_page();
        assert_eq!(player.timeline().current_time(), Timestamp::ZERO);
        assert!(player.timeline().state().fired_event_ids.is_empty());
    }

    #[test]
    fn start_page_is_clamped() {
        let config = PlayerConfig {
            start_page: 42,
            ..manual_config()
        };
        let player = StoryPlayer::new(demo_story().unwrap(), config).unwrap();
        assert_eq!(player.current_page_index(), 3);
    }

    #[test]
    fn completion_reports_and_optionally_advances() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), manual_config()).unwrap();
        player.play();
        player.tick(ms(0));
        let outputs = player.tick(ms(9000));
        assert!(outputs.contains(&PlayerOutput::PageComplete { index: 0 }));
        assert_eq!(player.current_page_index(), 0);

        let config = PlayerConfig {
            auto_play: false,
            auto_advance: true,
            ..PlayerConfig::default()
        };
        let mut player = StoryPlayer::new(demo_story().unwrap(), config).unwrap();
        player.play();
        player.tick(ms(0));
        let outputs = player.tick(ms(9000));
        assert_eq!(
            &outputs[outputs.len() - 2..],
            &[
                PlayerOutput::PageComplete { index: 0 },
                PlayerOutput::PageChanged { index: 1 }
            ]
        );
    }

    #[test]
    fn sound_and_narration_events_emit_audio() {
        let mut book = demo_story().unwrap();
        let page = &mut book.pages[0];
        page.narration = Some(NarrationConfig {
            provider: NarrationProvider::Upload,
            voice_id: None,
            audio_url: Some("page1.mp3".to_string()),
            text: None,
            auto_play: true,
            start_time: 0.0,
        });
        page.timeline.push(TimelineEvent {
            id: "narrate".to_string(),
            time: 0.0,
            target_id: "page-1".to_string(),
            action: EventAction::PlayNarration,
        });
        page.timeline.push(TimelineEvent {
            id: "chime".to_string(),
            time: 1.0,
            target_id: "title-text".to_string(),
            action: EventAction::PlaySound {
                url: "chime.mp3".to_string(),
            },
        });

        let mut player = StoryPlayer::new(book, manual_config()).unwrap();
        let outputs = player.seek(ms(1000));
        let cues: Vec<&AudioCue> = outputs
            .iter()
            .filter_map(|o| match o {
                PlayerOutput::Audio(cue) => Some(cue),
                _ => None,
            })
            .collect();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].kind, AudioKind::Narration);
        assert_eq!(cues[0].url, "page1.mp3");
        assert_eq!(cues[1].kind, AudioKind::Sound);
        assert_eq!(cues[1].volume, 0.6);
        assert_eq!(triggered(&outputs), vec!["narrate", "e1", "chime"]);
    }

    #[test]
    fn taps_only_land_on_visible_tappable_elements() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), manual_config()).unwrap();
        // Title appears at 0.5s.
        assert!(player.tap("title-text", ms(0)).is_empty());

        player.seek(ms(600));
        let outputs = player.tap("title-text", ms(10));
        assert_eq!(
            outputs,
            vec![PlayerOutput::Reaction {
                element_id: "title-text".to_string(),
                reaction: TapReactionType::Sparkle,
                particle_kind: ParticleKind::Sparkle,
            }]
        );

        // Subtitle is not tappable.
        player.seek(ms(2000));
        assert!(player.tap("subtitle-text", ms(20)).is_empty());
        assert!(player.tap("missing", ms(20)).is_empty());
    }

    #[test]
    fn frame_reflects_playhead_and_reactions() {
        let mut player = StoryPlayer::new(demo_story().unwrap(), manual_config()).unwrap();
        player.seek(ms(1500));
        player.tap("title-text", ms(100));

        let frame = player.frame(ms(200));
        assert_eq!(frame.page_count, 4);
        assert!(frame.is_first_page);
        assert_eq!(frame.time_label, "0:01 / 0:08");
        assert!((frame.progress - 18.75).abs() < 1e-9);
        let shown: Vec<&str> = frame
            .elements
            .iter()
            .filter(|e| e.shown)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(shown, vec!["title-text", "subtitle-text"]);
        assert_eq!(
            frame.elements[0].reaction_class.as_deref(),
            Some("tap-reaction-sparkle")
        );

        let later = player.frame(ms(1200));
        assert!(later.elements[0].reaction_class.is_none());
        assert!(later.elements[0].particles.is_none());
    }

    #[test]
    fn outputs_serialize_with_type_tag() {
        let json = serde_json::to_string(&PlayerOutput::PageComplete { index: 2 }).unwrap();
        assert_eq!(json, r#"{"type":"pageComplete","index":2}"#);
        let json = serde_json::to_string(&PlayerOutput::Audio(AudioCue::sound("a.mp3", 0.5))).unwrap();
        assert!(json.starts_with(r#"{"type":"audio","kind":"sound""#));
    }
}
