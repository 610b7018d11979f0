use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::{info, warn};
use serde::{Deserialize, Deserializer};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::debug::JsonFileStore;
use crate::error::ConfigError;
use crate::gestures::{Gesture, Thresholds};
use crate::landmarks::HandSide;
use crate::session::{Recognizer, RecognizerSettings};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub recognizer: RecognizerSettings,
    #[serde(default)]
    pub thresholds: Thresholds,

    // nested `[bindings.left]` tables become "left.circle" keys
    #[serde(default, deserialize_with = "deserialize_bindings_flat")]
    pub bindings: HashMap<String, String>,
}

/// What a bound gesture does once recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Spell(String),
    None,
}

impl Action {
    pub fn parse(s: &str) -> Option<Action> {
        let s = s.trim();
        if s == "none" {
            return Some(Action::None);
        }
        let name = s.strip_prefix("spell:")?.trim();
        (!name.is_empty()).then(|| Action::Spell(name.to_string()))
    }
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Profile> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn recognizer(&self) -> Result<Recognizer, ConfigError> {
        Recognizer::new(self.recognizer.clone(), self.thresholds.clone())
    }

    /// Hand-specific bindings win over plain gesture bindings.
    pub fn binding(&self, side: HandSide, gesture: Gesture) -> Option<Action> {
        let key = gesture.config_key();
        self.bindings
            .get(&format!("{}.{key}", side.as_str()))
            .or_else(|| self.bindings.get(key))
            .and_then(|a| Action::parse(a))
    }
}

fn deserialize_bindings_flat<'de, D>(
    de: D,
) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = toml::Value::deserialize(de)?;
    let table = match val {
        toml::Value::Table(t) => t,
        other => {
            return Err(serde::de::Error::custom(format!(
                "bindings must be a table, got {}",
                other.type_str()
            )));
        }
    };

    let mut out = HashMap::new();
    flatten_table("", &table, &mut out).map_err(serde::de::Error::custom)?;
    Ok(out)
}

fn flatten_table(
    prefix: &str,
    table: &toml::value::Table,
    out: &mut HashMap<String, String>,
) -> std::result::Result<(), String> {
    for (k, v) in table {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            toml::Value::String(s) => {
                out.insert(key, s.clone());
            }
            toml::Value::Table(sub) => flatten_table(&key, sub, out)?,
            other => {
                return Err(format!(
                    "binding '{key}' value must be a string, got {}",
                    other.type_str()
                ));
            }
        }
    }
    Ok(())
}

fn validate_profile(p: &Profile) -> Result<(), ConfigError> {
    p.thresholds.validate()?;
    p.recognizer.validate()?;

    for (k, v) in &p.bindings {
        let gesture = match k.split_once('.') {
            Some((hand, g)) => HandSide::parse(hand).and(Gesture::parse(g)),
            None => Gesture::parse(k),
        };
        if gesture.is_none() {
            return Err(ConfigError::UnknownGesture(k.clone()));
        }
        if Action::parse(v).is_none() {
            return Err(ConfigError::InvalidBinding {
                key: k.clone(),
                action: v.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn default_config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("could not determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("handspell"))
}

pub fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(default_config_dir()?)
    }

    /// Same as [`ConfigState::load_or_install_default`] rooted at `cfgdir`.
    pub fn load_or_install_in(cfgdir: impl Into<PathBuf>) -> Result<Self> {
        let cfgdir = cfgdir.into();
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let mut active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        if active_name.is_empty() {
            warn!("active profile pointer is empty; using 'default'");
            active_name = "default".to_string();
        }
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    /// Keeps the last good profile when the file on disk is broken.
    pub fn reload(&mut self) -> Result<()> {
        self.profile = load_profile(&self.profiles_dir, &self.active_name)?;
        Ok(())
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        let profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    /// Loads a named profile without switching to it.
    pub fn profile_named(&self, name: &str) -> Result<Profile> {
        load_profile(&self.profiles_dir, name)
    }

    pub fn debug_store(&self) -> JsonFileStore {
        JsonFileStore::new(self.config_dir.join("debug.json"))
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let broken: Vec<String> = self
            .list_profiles()
            .into_iter()
            .filter(|name| load_profile(&self.profiles_dir, name).is_err())
            .collect();
        serde_json::json!({
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "profiles": self.list_profiles(),
            "broken_profiles": broken,
            "recognizer": self.profile.recognizer,
            "thresholds": self.profile.thresholds,
            "bindings": self.profile.bindings.len(),
            "debug_store": self.debug_store().path(),
        })
    }
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path)
        .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
    Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
}
