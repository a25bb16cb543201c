//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stable, unique identifier for an employee record.
pub type EmployeeId = String;

/// An organizational job-family name ("Sales", "Production", ...).
pub type BandName = String;

/// A scenario identifier. `"default"` is reserved.
pub type ScenarioId = String;

/// The dataset/file context that scopes persisted scenarios.
pub type WorkspaceId = String;

/// Organizational seniority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    L1,
    L2,
    L3,
    L4,
}

impl Level {
    /// All levels, lowest first. Iteration order everywhere follows this.
    pub const ALL: [Level; 4] = [Level::L1, Level::L2, Level::L3, Level::L4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L1" | "LV.1" => Ok(Self::L1),
            "L2" | "LV.2" => Ok(Self::L2),
            "L3" | "LV.3" => Ok(Self::L3),
            "L4" | "LV.4" => Ok(Self::L4),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// Performance evaluation grade. Only the merit component is scaled by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceGrade {
    S,
    A,
    B,
    C,
}

impl PerformanceGrade {
    pub const ALL: [PerformanceGrade; 4] = [
        PerformanceGrade::S,
        PerformanceGrade::A,
        PerformanceGrade::B,
        PerformanceGrade::C,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceGrade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Self::S),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(format!("unknown performance grade: {other}")),
        }
    }
}
