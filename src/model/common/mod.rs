//! Types shared between the database and API representations.

pub mod poll;
pub mod skill;
pub mod team;

pub use poll::PollStatus;
pub use skill::{validate_skills, RawSkill, Skill, SkillName};
pub use team::Team;
