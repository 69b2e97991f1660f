use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::model::Qwen3Error;

/// Voice identities built into the CustomVoice checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Speaker {
    Vivian,
    Serena,
    #[serde(rename = "Uncle_Fu")]
    UncleFu,
    Dylan,
    Eric,
    Ryan,
    Aiden,
    #[serde(rename = "Ono_Anna")]
    OnoAnna,
    Sohee,
}

pub const DEFAULT_SPEAKER: Speaker = Speaker::Ryan;

impl Speaker {
    pub const ALL: [Speaker; 9] = [
        Speaker::Vivian,
        Speaker::Serena,
        Speaker::UncleFu,
        Speaker::Dylan,
        Speaker::Eric,
        Speaker::Ryan,
        Speaker::Aiden,
        Speaker::OnoAnna,
        Speaker::Sohee,
    ];

    /// Identifier as understood by the model.
    pub fn as_str(self) -> &'static str {
        match self {
            Speaker::Vivian => "Vivian",
            Speaker::Serena => "Serena",
            Speaker::UncleFu => "Uncle_Fu",
            Speaker::Dylan => "Dylan",
            Speaker::Eric => "Eric",
            Speaker::Ryan => "Ryan",
            Speaker::Aiden => "Aiden",
            Speaker::OnoAnna => "Ono_Anna",
            Speaker::Sohee => "Sohee",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Speaker::Vivian => "Bright, slightly edgy young female (Chinese)",
            Speaker::Serena => "Warm, gentle young female (Chinese)",
            Speaker::UncleFu => "Seasoned male, low mellow timbre (Chinese)",
            Speaker::Dylan => "Youthful Beijing male, clear natural (Chinese-Beijing)",
            Speaker::Eric => "Lively Chengdu male, slightly husky (Chinese-Sichuan)",
            Speaker::Ryan => "Dynamic male, strong rhythmic (English)",
            Speaker::Aiden => "Sunny American male, clear midrange (English)",
            Speaker::OnoAnna => "Playful Japanese female, light nimble (Japanese)",
            Speaker::Sohee => "Warm Korean female, rich emotion (Korean)",
        }
    }
}

impl FromStr for Speaker {
    type Err = Qwen3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Speaker::ALL
            .iter()
            .copied()
            .find(|speaker| speaker.as_str() == s)
            .ok_or_else(|| Qwen3Error::UnknownSpeaker(s.to_string()))
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Languages accepted by the model, plus `Auto` for model-side detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Language {
    Auto,
    Chinese,
    English,
    Japanese,
    Korean,
    German,
    French,
    Russian,
    Portuguese,
    Spanish,
    Italian,
}

pub const DEFAULT_LANGUAGE: Language = Language::Auto;

impl Language {
    pub const ALL: [Language; 11] = [
        Language::Auto,
        Language::Chinese,
        Language::English,
        Language::Japanese,
        Language::Korean,
        Language::German,
        Language::French,
        Language::Russian,
        Language::Portuguese,
        Language::Spanish,
        Language::Italian,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Auto => "Auto",
            Language::Chinese => "Chinese",
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::Korean => "Korean",
            Language::German => "German",
            Language::French => "French",
            Language::Russian => "Russian",
            Language::Portuguese => "Portuguese",
            Language::Spanish => "Spanish",
            Language::Italian => "Italian",
        }
    }

    /// The value to forward to the model. `Auto` is never forwarded so the
    /// model can detect the language itself.
    pub fn for_model(self) -> Option<Language> {
        match self {
            Language::Auto => None,
            other => Some(other),
        }
    }
}

impl FromStr for Language {
    type Err = Qwen3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .iter()
            .copied()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| Qwen3Error::UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker id to description, as an owned map.
pub fn speaker_descriptions() -> BTreeMap<String, String> {
    Speaker::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), s.description().to_string()))
        .collect()
}

/// Supported language names in sorted order.
pub fn language_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = Language::ALL.iter().map(|l| l.as_str()).collect();
    names.sort_unstable();
    names
}
