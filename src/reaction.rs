// Tap reactions: a transient reaction class, a particle burst, and an optional sound.
// Last tap wins; there is no queue and no debounce.

use std::collections::HashMap;
use std::f32::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::audio::AudioCue;
use crate::story::{ParticleKind, TapReactionType};
use crate::types::{ReactionSettings, Timestamp};

/// Where a tap landed. Decides which particles a reaction spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapSource {
    Text,
    Image,
    /// Hotspots carry their own particle choice.
    Hotspot(Option<ParticleKind>),
}

/// Particle flavour for a tap on `source` with `reaction`.
pub fn particle_kind_for(source: TapSource, reaction: TapReactionType) -> ParticleKind {
    match source {
        TapSource::Text if reaction == TapReactionType::Sparkle => ParticleKind::Sparkle,
        TapSource::Text => ParticleKind::Hearts,
        TapSource::Image if reaction == TapReactionType::Sparkle => ParticleKind::Sparkle,
        TapSource::Image => ParticleKind::Stars,
        TapSource::Hotspot(kind) => kind.unwrap_or_default(),
    }
}

/// Glyph drawn for particle `index` of a burst.
pub fn glyph_for(kind: ParticleKind, index: usize) -> &'static str {
    const HEARTS: [&str; 4] = ["❤️", "💕", "💖", "💗"];
    const STARS: [&str; 4] = ["⭐", "✨", "🌟", "💫"];
    const CONFETTI: [&str; 4] = ["🎉", "🎊", "✨", "🎈"];
    match kind {
        ParticleKind::Hearts => HEARTS[index % 4],
        ParticleKind::Stars => STARS[index % 4],
        ParticleKind::Confetti => CONFETTI[index % 4],
        ParticleKind::Sparkle => "✨",
    }
}

/// One particle of a burst. Offsets are pixels from the element centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    /// Degrees.
    pub angle: f32,
    /// Seconds.
    pub delay: f32,
    pub scale: f32,
    pub glyph: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleBurst {
    pub kind: ParticleKind,
    pub particles: Vec<Particle>,
}

impl ParticleBurst {
    /// Fan `count` particles evenly around the centre with a slight upward bias.
    pub fn generate(kind: ParticleKind, count: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let particles = (0..count)
            .map(|i| {
                let angle = i as f32 / count as f32 * 360.0;
                let distance = 30.0 + rng.gen::<f32>() * 40.0;
                let radians = angle * PI / 180.0;
                Particle {
                    index: i,
                    x: radians.cos() * distance,
                    y: radians.sin() * distance - 20.0,
                    angle,
                    delay: rng.gen::<f32>() * 0.2,
                    scale: 0.5 + rng.gen::<f32>() * 0.5,
                    glyph: glyph_for(kind, i),
                }
            })
            .collect();
        ParticleBurst { kind, particles }
    }
}

#[derive(Debug, Clone)]
struct ActiveReaction {
    reaction: TapReactionType,
    reaction_until: Timestamp,
    burst: ParticleBurst,
    particles_until: Timestamp,
}

/// What an element should render for its reaction at a given instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionView {
    pub reaction_class: Option<String>,
    pub particles: Option<ParticleBurst>,
}

/// Result of a tap that triggered a reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TapOutcome {
    pub element_id: String,
    pub reaction: TapReactionType,
    pub particle_kind: ParticleKind,
    pub sound: Option<AudioCue>,
}

/// Tracks live reactions per element against the host clock.
#[derive(Debug, Clone)]
pub struct TapReactor {
    settings: ReactionSettings,
    active: HashMap<String, ActiveReaction>,
    taps: u64,
}

impl TapReactor {
    pub fn new(settings: ReactionSettings) -> Self {
        TapReactor {
            settings,
            active: HashMap::new(),
            taps: 0,
        }
    }

    /// Start (or restart) the reaction for `element_id`.
    pub fn tap(
        &mut self,
        element_id: &str,
        reaction: TapReactionType,
        sound: Option<&str>,
        source: TapSource,
        now: Timestamp,
    ) -> TapOutcome {
        let particle_kind = particle_kind_for(source, reaction);
        self.taps = self.taps.wrapping_add(1);
        let seed = self.settings.seed ^ self.taps.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let burst = ParticleBurst::generate(particle_kind, self.settings.particle_count, seed);

        self.active.insert(
            element_id.to_string(),
            ActiveReaction {
                reaction,
                reaction_until: now.add_millis(self.settings.reaction_ms),
                burst,
                particles_until: now.add_millis(self.settings.particle_ms),
            },
        );

        TapOutcome {
            element_id: element_id.to_string(),
            reaction,
            particle_kind,
            sound: sound.map(|url| AudioCue::tap_sound(url, self.settings.tap_sound_volume)),
        }
    }

    pub fn view(&self, element_id: &str, now: Timestamp) -> ReactionView {
        let Some(active) = self.active.get(element_id) else {
            return ReactionView::default();
        };
        ReactionView {
            reaction_class: (now < active.reaction_until)
                .then(|| format!("tap-reaction-{}", active.reaction.name())),
            particles: (now < active.particles_until).then(|| active.burst.clone()),
        }
    }

    /// Drop reactions whose particles have finished.
    pub fn prune(&mut self, now: Timestamp) {
        self.active.retain(|_, a| now < a.particles_until);
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Timestamp {
        Timestamp::from_micros(v * 1000)
    }

    #[test]
    fn particle_kind_rules() {
        assert_eq!(
            particle_kind_for(TapSource::Text, TapReactionType::Sparkle),
            ParticleKind::Sparkle
        );
        assert_eq!(
            particle_kind_for(TapSource::Text, TapReactionType::Pop),
            ParticleKind::Hearts
        );
        assert_eq!(
            particle_kind_for(TapSource::Image, TapReactionType::Wiggle),
            ParticleKind::Stars
        );
        assert_eq!(
            particle_kind_for(TapSource::Hotspot(Some(ParticleKind::Confetti)), TapReactionType::Pop),
            ParticleKind::Confetti
        );
        assert_eq!(
            particle_kind_for(TapSource::Hotspot(None), TapReactionType::Pop),
            ParticleKind::Sparkle
        );
    }

    #[test]
    fn burst_layout_is_seeded_and_bounded() {
        let a = ParticleBurst::generate(ParticleKind::Hearts, 8, 42);
        let b = ParticleBurst::generate(ParticleKind::Hearts, 8, 42);
        assert_eq!(a, b);
        assert_eq!(a.particles.len(), 8);
        for p in &a.particles {
            let dist = (p.x.powi(2) + (p.y + 20.0).powi(2)).sqrt();
            assert!((29.9..=70.1).contains(&dist), "distance {dist}");
            assert!((0.0..=0.2).contains(&p.delay));
            assert!((0.5..1.0).contains(&p.scale));
        }
        assert_eq!(a.particles[2].angle, 90.0);
        assert_eq!(a.particles[1].glyph, "💕");
    }

    #[test]
    fn reaction_and_particles_expire_separately() {
        let mut reactor = TapReactor::new(ReactionSettings::default());
        let outcome = reactor.tap("flower", TapReactionType::Wiggle, None, TapSource::Text, ms(1000));
        assert!(outcome.sound.is_none());

        let early = reactor.view("flower", ms(1200));
        assert_eq!(early.reaction_class.as_deref(), Some("tap-reaction-wiggle"));
        assert!(early.particles.is_some());

        let mid = reactor.view("flower", ms(1500));
        assert!(mid.reaction_class.is_none());
        assert!(mid.particles.is_some());

        let done = reactor.view("flower", ms(2000));
        assert_eq!(done, ReactionView::default());

        reactor.prune(ms(2000));
        assert_eq!(reactor.active_count(), 0);
    }

    #[test]
    fn last_tap_wins() {
        let mut reactor = TapReactor::new(ReactionSettings::default());
        reactor.tap("heart", TapReactionType::Pop, None, TapSource::Text, ms(0));
        reactor.tap("heart", TapReactionType::Spin, None, TapSource::Text, ms(400));
        let view = reactor.view("heart", ms(800));
        assert_eq!(view.reaction_class.as_deref(), Some("tap-reaction-spin"));
        assert_eq!(reactor.active_count(), 1);
    }

    #[test]
    fn tap_sound_uses_configured_volume() {
        let mut reactor = TapReactor::new(ReactionSettings::default());
        let outcome = reactor.tap(
            "bell",
            TapReactionType::Bounce,
            Some("bell.mp3"),
            TapSource::Image,
            ms(0),
        );
        let sound = outcome.sound.unwrap();
        assert_eq!(sound.url, "bell.mp3");
        assert_eq!(sound.volume, 0.5);
        assert_eq!(outcome.particle_kind, ParticleKind::Stars);
    }
}
