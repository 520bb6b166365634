//! Profile exchange JSON.
//!
//! ```text
//! {"n": "Blooming", "m": 1, "s": [[2.0, 8.0], {"t": 9.0, "c": 20.0}]}
//! ```
//!
//! `m = 1` is stepped, anything else ramped.  Steps come either as
//! `[target, duration]` pairs or as `{"t", "c"}` objects; a pair of any
//! other length is a parse error.  Export always writes pairs.

use serde::{Deserialize, Serialize};

use crate::error::{ParseIssue, ProfileError};

use super::{MAX_PROFILES, Profile, ProfileMode, Step};

/// Name given to an imported profile that carries none.
pub const DEFAULT_IMPORT_NAME: &str = "Imported Profile";

/// Name given to a profile saved by slot without one.
pub const DEFAULT_SLOT_NAME: &str = "Unnamed";

#[derive(Deserialize)]
#[serde(untagged)]
enum StepDoc {
    Pair([f32; 2]),
    Object {
        #[serde(default)]
        t: f32,
        #[serde(default = "default_duration")]
        c: f32,
    },
}

fn default_duration() -> f32 {
    1.0
}

impl StepDoc {
    fn to_step(&self) -> Step {
        match self {
            Self::Pair([target, duration]) => Step::new(*target, *duration),
            Self::Object { t, c } => Step::new(*t, *c),
        }
    }
}

#[derive(Deserialize)]
struct ProfileDoc {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    m: Option<i64>,
    #[serde(default)]
    s: Vec<StepDoc>,
}

impl ProfileDoc {
    fn parse(json: &str) -> Result<Self, ProfileError> {
        serde_json::from_str(json).map_err(|e| {
            ProfileError::ImportParse(ParseIssue::Syntax {
                line: e.line(),
                column: e.column(),
            })
        })
    }

    fn into_profile(self, default_name: &str) -> Result<Profile, ProfileError> {
        if self.s.is_empty() {
            return Err(ProfileError::ImportParse(ParseIssue::NoSteps));
        }
        let mode = if self.m == Some(1) {
            ProfileMode::Stepped
        } else {
            ProfileMode::Ramped
        };
        let mut profile = Profile::new(self.n.as_deref().unwrap_or(default_name), mode, &[]);
        for step in &self.s {
            if !profile.push_step(step.to_step()) {
                break;
            }
        }
        Ok(profile)
    }
}

/// Parse an imported profile (`profile_data` topic, serial import).
pub fn import(json: &str) -> Result<Profile, ProfileError> {
    ProfileDoc::parse(json)?.into_profile(DEFAULT_IMPORT_NAME)
}

/// Parse a save-by-slot document, which additionally carries `"id"`.
pub fn parse_slot_document(json: &str) -> Result<(usize, Profile), ProfileError> {
    let doc = ProfileDoc::parse(json)?;
    let slot = match doc.id {
        Some(id) if (0..MAX_PROFILES as i64).contains(&id) => id as usize,
        Some(id) if id >= 0 => return Err(ProfileError::InvalidSlot(id as usize)),
        _ => return Err(ProfileError::ImportParse(ParseIssue::MissingId)),
    };
    Ok((slot, doc.into_profile(DEFAULT_SLOT_NAME)?))
}

#[derive(Serialize)]
struct ExportDoc<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<usize>,
    n: &'a str,
    m: u8,
    s: Vec<[f32; 2]>,
}

impl<'a> ExportDoc<'a> {
    fn new(id: Option<usize>, profile: &'a Profile) -> Self {
        Self {
            id,
            n: profile.name(),
            m: profile.mode.as_u8(),
            s: profile
                .steps()
                .iter()
                .map(|s| [s.target, s.duration])
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ListDoc<'a> {
    active: usize,
    profiles: Vec<ExportDoc<'a>>,
}

/// Serialise a profile for the `profile_data` topic.
pub fn export(profile: &Profile) -> String {
    // Plain structs of strings and floats cannot fail to serialise.
    serde_json::to_string(&ExportDoc::new(None, profile)).unwrap_or_default()
}

/// Serialise every slot, empty ones included, for the profile list view.
pub fn export_list(active: usize, slots: &[Profile]) -> String {
    let doc = ListDoc {
        active,
        profiles: slots
            .iter()
            .enumerate()
            .map(|(i, p)| ExportDoc::new(Some(i), p))
            .collect(),
    };
    serde_json::to_string(&doc).unwrap_or_default()
}
