//! Pure, synchronous query classifier: `(user_id, message) -> (model_key, reason)`.
//!
//! No I/O. Decision priority, first match wins: forced profile preference,
//! hard teen/child override, conversational keyword, complexity keyword,
//! word-count thresholds, default fast. Keyword matching is whole-word /
//! whole-phrase (regex word boundaries), case- and accent-preserving,
//! Unicode-aware — "quoi" must not match inside "pourquoi".

use std::collections::HashMap;

use jarvis_domain::users::{Profile, Profiles, UserId};
use regex::Regex;

use crate::config::{ClassifierConfig, ModelPreference as ConfigModelPreference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKey {
    Fast,
    Full,
}

impl ModelKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::Fast => "fast",
            ModelKey::Full => "full",
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassifyResult {
    pub model_key: ModelKey,
    pub reason: String,
}

/// Compiled, whole-word/phrase matchers for the configured keyword lists.
/// Compiling once at construction avoids rebuilding a `Regex` per request.
pub struct Classifier {
    config: ClassifierConfig,
    conversational: Vec<(String, Regex)>,
    complexity: Vec<(String, Regex)>,
}

fn phrase_regex(phrase: &str) -> Regex {
    // \b is Unicode-aware in the `regex` crate by default; phrases are
    // matched case-insensitively but accents are preserved verbatim (no
    // normalization).
    let escaped = regex::escape(phrase);
    let pattern = format!(r"(?i)\b{escaped}\b");
    Regex::new(&pattern).expect("phrase pattern is always valid regex")
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let conversational = config
            .conversational_phrases
            .iter()
            .map(|p| (p.clone(), phrase_regex(p)))
            .collect();
        let complexity = config
            .complexity_phrases
            .iter()
            .map(|p| (p.clone(), phrase_regex(p)))
            .collect();
        Self {
            config,
            conversational,
            complexity,
        }
    }

    pub fn classify(&self, user_id: UserId, message: &str, profiles: &Profiles) -> ClassifyResult {
        let profile = profiles.get(user_id);

        if let Some(forced) = forced_preference(profile) {
            return ClassifyResult {
                model_key: forced,
                reason: format!(
                    "{user_id} has a forced model_preference of {}",
                    forced.as_str()
                ),
            };
        }

        if matches!(user_id, UserId::Teen | UserId::Child) {
            return ClassifyResult {
                model_key: ModelKey::Fast,
                reason: format!("{user_id} is a restricted user; fast model enforced"),
            };
        }

        if let Some((phrase, _)) = self.conversational.iter().find(|(_, re)| re.is_match(message)) {
            return ClassifyResult {
                model_key: ModelKey::Fast,
                reason: format!("message matches conversational phrase '{phrase}'"),
            };
        }

        if let Some((phrase, _)) = self.complexity.iter().find(|(_, re)| re.is_match(message)) {
            return ClassifyResult {
                model_key: ModelKey::Full,
                reason: format!("message matches complexity phrase '{phrase}'"),
            };
        }

        let words = word_count(message);
        if words < self.config.fast_threshold_words {
            return ClassifyResult {
                model_key: ModelKey::Fast,
                reason: format!(
                    "message has {words} words, below fast_threshold_words ({})",
                    self.config.fast_threshold_words
                ),
            };
        }
        if words > self.config.full_threshold_words {
            return ClassifyResult {
                model_key: ModelKey::Full,
                reason: format!(
                    "message has {words} words, above full_threshold_words ({})",
                    self.config.full_threshold_words
                ),
            };
        }

        ClassifyResult {
            model_key: ModelKey::Fast,
            reason: "default: no rule matched, falling back to fast".to_string(),
        }
    }
}

fn forced_preference(profile: Option<&Profile>) -> Option<ModelKey> {
    let profile = profile?;
    match profile.model_preference? {
        jarvis_domain::users::ModelPreference::Fast => Some(ModelKey::Fast),
        jarvis_domain::users::ModelPreference::Full => Some(ModelKey::Full),
        jarvis_domain::users::ModelPreference::None => None,
    }
}

fn word_count(message: &str) -> usize {
    message.split_whitespace().count()
}

/// Resolves a [`ModelKey`] to the configured model name for the chat runtime.
pub fn resolve_model_name(key: ModelKey, runtime: &crate::config::RuntimeConfig) -> String {
    match key {
        ModelKey::Fast => runtime.fast_model.clone(),
        ModelKey::Full => runtime.full_model.clone(),
    }
}

/// Converts the llm-sidecar's own [`crate::config::ProfileConfig`] map into
/// the shared [`Profiles`] registry the classifier consumes, falling back to
/// [`Profiles::default`] entries for anything left unconfigured.
pub fn build_profiles(raw: &HashMap<String, crate::config::ProfileConfig>) -> Profiles {
    let mut defaults = Profiles::default();
    for uid in UserId::ALL {
        if let Some(cfg) = raw.get(uid.as_str()) {
            let mut profile = defaults.get(uid).cloned().unwrap_or(Profile {
                role: uid.role(),
                model_preference: None,
                system_prompt: String::new(),
            });
            if let Some(pref) = cfg.model_preference {
                profile.model_preference = Some(match pref {
                    ConfigModelPreference::Fast => jarvis_domain::users::ModelPreference::Fast,
                    ConfigModelPreference::Full => jarvis_domain::users::ModelPreference::Full,
                    ConfigModelPreference::None => jarvis_domain::users::ModelPreference::None,
                });
            }
            if let Some(prompt) = &cfg.system_prompt {
                profile.system_prompt = prompt.clone();
            }
            defaults.set(uid, profile);
        }
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default())
    }

    #[test]
    fn teen_and_child_are_always_fast() {
        let c = classifier();
        let profiles = Profiles::default();
        let long_complex =
            "Explique la blockchain en detail pourquoi c'est utile et compare avec les bases de donnees traditionnelles";
        for uid in [UserId::Teen, UserId::Child] {
            let result = c.classify(uid, long_complex, &profiles);
            assert_eq!(result.model_key, ModelKey::Fast);
            assert!(result.reason.contains(uid.as_str()));
        }
    }

    #[test]
    fn quoi_does_not_match_inside_pourquoi() {
        let mut cfg = ClassifierConfig::default();
        cfg.conversational_phrases = vec!["quoi".into()];
        cfg.complexity_phrases = vec![];
        let c = Classifier::new(cfg);
        let profiles = Profiles::default();
        // "pourquoi" contains "quoi" as a substring but not as a whole word.
        let result = c.classify(UserId::Dad, "Pourquoi le ciel est bleu ?", &profiles);
        assert_ne!(result.reason, "message matches conversational phrase 'quoi'");
    }

    #[test]
    fn short_message_is_fast() {
        let c = classifier();
        let profiles = Profiles::default();
        let result = c.classify(UserId::Dad, "Salut toi", &profiles);
        assert_eq!(result.model_key, ModelKey::Fast);
    }

    #[test]
    fn long_message_is_full() {
        let c = classifier();
        let profiles = Profiles::default();
        let words: Vec<&str> = std::iter::repeat("mot").take(80).collect();
        let message = words.join(" ");
        let result = c.classify(UserId::Dad, &message, &profiles);
        assert_eq!(result.model_key, ModelKey::Full);
    }

    #[test]
    fn forced_preference_wins_over_everything() {
        let c = classifier();
        let mut profiles = Profiles::default();
        let mut profile = profiles.get(UserId::Teen).unwrap().clone();
        profile.model_preference = Some(jarvis_domain::users::ModelPreference::Full);
        profiles.set(UserId::Teen, profile);
        let result = c.classify(UserId::Teen, "short", &profiles);
        assert_eq!(result.model_key, ModelKey::Full);
        assert!(result.reason.contains("teen"));
    }

    #[test]
    fn determinism_across_calls() {
        let c = classifier();
        let profiles = Profiles::default();
        let a = c.classify(UserId::Mom, "quelle heure est-il", &profiles);
        let b = c.classify(UserId::Mom, "quelle heure est-il", &profiles);
        assert_eq!(a.model_key, b.model_key);
        assert_eq!(a.reason, b.reason);
    }
}
