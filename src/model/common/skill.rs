use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MIN_SKILL_VALUE: i32 = 1;
pub const MAX_SKILL_VALUE: i32 = 10;

/// The fixed vocabulary of skills a player can rate themselves on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillName {
    Speed,
    Dribbling,
    Shooting,
    Defending,
    Passing,
    Stamina,
}

impl SkillName {
    pub const ALL: [SkillName; 6] = [
        Self::Speed,
        Self::Dribbling,
        Self::Shooting,
        Self::Defending,
        Self::Passing,
        Self::Stamina,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Dribbling => "dribbling",
            Self::Shooting => "shooting",
            Self::Defending => "defending",
            Self::Passing => "passing",
            Self::Stamina => "stamina",
        }
    }
}

impl Display for SkillName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillName {
    type Err = ();

    /// Case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == lower)
            .ok_or(())
    }
}

/// A validated skill rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: SkillName,
    pub value: i32,
}

/// A skill exactly as a client sent it, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSkill {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: i32,
}

impl TryFrom<&RawSkill> for Skill {
    type Error = Error;

    fn try_from(raw: &RawSkill) -> Result<Self> {
        let name = raw
            .name
            .parse::<SkillName>()
            .map_err(|_| Error::bad_request(format!("invalid skill: {}", raw.name)))?;
        if !(MIN_SKILL_VALUE..=MAX_SKILL_VALUE).contains(&raw.value) {
            return Err(Error::bad_request(format!(
                "skill value must be between {MIN_SKILL_VALUE} and {MAX_SKILL_VALUE}"
            )));
        }
        Ok(Self {
            name,
            value: raw.value,
        })
    }
}

/// Validate a full skill set: it must be non-empty and every entry must be valid.
pub fn validate_skills(raw: &[RawSkill]) -> Result<Vec<Skill>> {
    if raw.is_empty() {
        return Err(Error::bad_request("at least one skill is required"));
    }
    raw.iter().map(Skill::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, value: i32) -> RawSkill {
        RawSkill {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        let skill = Skill::try_from(&raw("Speed", 7)).unwrap();
        assert_eq!(skill.name, SkillName::Speed);
        assert_eq!(skill.name.to_string(), "speed");
        assert_eq!("DRIBBLING".parse::<SkillName>(), Ok(SkillName::Dribbling));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = Skill::try_from(&raw("agility", 5)).unwrap_err();
        assert_eq!(err.to_string(), "invalid skill: agility");
    }

    #[test]
    fn values_must_be_in_range() {
        assert!(Skill::try_from(&raw("speed", 0)).is_err());
        assert!(Skill::try_from(&raw("speed", 11)).is_err());
        assert!(Skill::try_from(&raw("speed", 1)).is_ok());
        assert!(Skill::try_from(&raw("speed", 10)).is_ok());
    }

    #[test]
    fn empty_skill_set_is_rejected() {
        assert!(validate_skills(&[]).is_err());
        let skills = validate_skills(&[raw("passing", 3), raw("Stamina", 9)]).unwrap();
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[1].name, SkillName::Stamina);
    }

    #[test]
    fn serialises_lowercase() {
        let skill = Skill {
            name: SkillName::Defending,
            value: 4,
        };
        let json = rocket::serde::json::to_string(&skill).unwrap();
        assert_eq!(json, r#"{"name":"defending","value":4}"#);
    }
}
