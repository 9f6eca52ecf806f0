//! Turns archived comments into display tokens.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::{
    api::models::{BadgeSets, Comment, Fragment},
    common::duration::to_hhmmss,
    emotes::{BadgeCache, BadgeImageSet, Emote, EmoteCdn, EmoteLookup, EmoteProvider, EmoteSets},
    storage::ChatSettings,
};

fn emoji_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[\x{1F1E6}-\x{1F1FF}]{2}|\p{Extended_Pictographic}\x{FE0F}?\p{Emoji_Modifier}?(?:\x{200D}\p{Extended_Pictographic}\x{FE0F}?\p{Emoji_Modifier}?)*",
        )
        .expect("emoji pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmoteImage {
    pub code: String,
    pub provider: EmoteProvider,
    pub url: String,
    pub srcset: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    /// A unicode emoji sequence and its pictograph.
    Emoji { text: String, url: String },
    Emote(EmoteImage),
    /// A zero-width emote layered over the emote before it.
    Stacked { base: EmoteImage, overlay: EmoteImage },
}

impl Token {
    fn as_text(&self) -> String {
        match self {
            Self::Text(text) | Self::Emoji { text, .. } => text.clone(),
            Self::Emote(image) => image.code.clone(),
            Self::Stacked { base, overlay } => format!("{} {}", base.code, overlay.code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub id: String,
    pub offset: f64,
    /// `HH:MM:SS` label, when timestamps are enabled.
    pub timestamp: Option<String>,
    pub display_name: String,
    pub user_color: Option<String>,
    pub badges: Vec<Arc<BadgeImageSet>>,
    pub tokens: Vec<Token>,
}

impl RenderedMessage {
    pub fn plain_text(&self) -> String {
        let body: Vec<String> = self.tokens.iter().map(Token::as_text).collect();
        body.join(" ")
    }
}

/// Holds everything rendering consults. The emote lookup is rebuilt as a
/// whole whenever the emote sets change.
pub struct MessageRenderer {
    lookup: EmoteLookup,
    cdn: EmoteCdn,
    twemoji_base: String,
    badge_cache: Arc<BadgeCache>,
    badge_sets: Option<BadgeSets>,
    settings: ChatSettings,
}

impl MessageRenderer {
    pub fn new(cdn: EmoteCdn, twemoji_base: &str, badge_cache: Arc<BadgeCache>) -> Self {
        Self {
            lookup: EmoteLookup::default(),
            cdn,
            twemoji_base: twemoji_base.trim_end_matches('/').to_string(),
            badge_cache,
            badge_sets: None,
            settings: ChatSettings::default(),
        }
    }

    pub fn set_emotes(&mut self, sets: &EmoteSets) {
        self.lookup = EmoteLookup::build(sets);
    }

    pub fn lookup(&self) -> &EmoteLookup {
        &self.lookup
    }

    pub fn set_badge_sets(&mut self, badges: BadgeSets) {
        self.badge_sets = Some(badges);
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ChatSettings) {
        self.settings = settings;
    }

    /// `None` for comments without a message or hidden by a filter word.
    pub fn render(&self, comment: &Comment) -> Option<RenderedMessage> {
        let fragments = comment.message.as_deref()?;
        if self.settings.is_filtered(&comment.text()) {
            return None;
        }

        Some(RenderedMessage {
            id: comment.id.clone(),
            offset: comment.content_offset_seconds,
            timestamp: self
                .settings
                .show_timestamp
                .then(|| to_hhmmss(comment.content_offset_seconds)),
            display_name: comment.display_name.clone(),
            user_color: comment.user_color.clone(),
            badges: self.render_badges(comment),
            tokens: fragments.iter().flat_map(|f| self.render_fragment(f)).collect(),
        })
    }

    fn render_badges(&self, comment: &Comment) -> Vec<Arc<BadgeImageSet>> {
        let (Some(user_badges), Some(sets)) = (&comment.user_badges, &self.badge_sets) else {
            return Vec::new();
        };
        user_badges
            .iter()
            .filter_map(|b| self.badge_cache.resolve(&b.set_id, &b.version, sets))
            .collect()
    }

    fn image(&self, emote: &Emote) -> EmoteImage {
        EmoteImage {
            code: emote.code.clone(),
            provider: emote.provider,
            url: self.cdn.image_url(emote, 1),
            srcset: self.cdn.srcset(emote),
        }
    }

    fn render_fragment(&self, fragment: &Fragment) -> Vec<Token> {
        if let Some(id) = fragment.platform_emote_id() {
            let emote = Emote::platform(id, &fragment.text);
            return vec![Token::Emote(self.image(&emote))];
        }

        let mut tokens = Vec::new();
        // Index of the last plain emote a zero-width one may stack on.
        let mut last_emote: Option<usize> = None;

        for word in fragment.text.split_whitespace() {
            let Some(emote) = self.lookup.resolve(word) else {
                last_emote = None;
                tokens.extend(self.text_tokens(word));
                continue;
            };

            let image = self.image(emote);
            match last_emote.take() {
                Some(idx) if emote.zero_width => {
                    if let Token::Emote(base) = tokens[idx].clone() {
                        tokens[idx] = Token::Stacked {
                            base,
                            overlay: image,
                        };
                    }
                }
                _ => {
                    tokens.push(Token::Emote(image));
                    last_emote = Some(tokens.len() - 1);
                }
            }
        }

        tokens
    }

    /// Splits a word into text runs and emoji pictographs.
    fn text_tokens(&self, word: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut rest = 0;
        for m in emoji_regex().find_iter(word) {
            if m.start() > rest {
                tokens.push(Token::Text(word[rest..m.start()].to_string()));
            }
            tokens.push(Token::Emoji {
                text: m.as_str().to_string(),
                url: self.twemoji_url(m.as_str()),
            });
            rest = m.end();
        }
        if rest < word.len() {
            tokens.push(Token::Text(word[rest..].to_string()));
        }
        tokens
    }

    /// Codepoints in lowercase hex joined by `-`; the variation selector is
    /// dropped unless the sequence has a zero-width joiner.
    fn twemoji_url(&self, emoji: &str) -> String {
        let keep_vs16 = emoji.contains('\u{200D}');
        let code: Vec<String> = emoji
            .chars()
            .filter(|c| keep_vs16 || *c != '\u{FE0F}')
            .map(|c| format!("{:x}", c as u32))
            .collect();
        format!("{}/{}.png", self.twemoji_base, code.join("-"))
    }
}
