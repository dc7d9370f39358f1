use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::datetime::wire_date;

pub type TaskId = u64;

/// Task status as reported by the service.
///
/// Values outside the known set are kept verbatim in `Unknown` so they can be
/// displayed and sent back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Red,
    Blue,
    Green,
    Gray,
}

impl Status {
    pub const KNOWN: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "Pendente",
            Status::InProgress => "Em Progresso",
            Status::Completed => "Concluído",
            Status::Unknown(_) => "Desconhecido",
        }
    }

    pub fn color(&self) -> StatusColor {
        match self {
            Status::Pending => StatusColor::Red,
            Status::InProgress => StatusColor::Blue,
            Status::Completed => StatusColor::Green,
            Status::Unknown(_) => StatusColor::Gray,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Status::Unknown(_))
    }

    /// Lenient conversion used for wire data.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "pending" => Status::Pending,
            "in_progress" => Status::InProgress,
            "completed" => Status::Completed,
            other => Status::Unknown(other.to_string()),
        }
    }
}

impl StatusColor {
    pub fn ansi_code(self) -> &'static str {
        match self {
            StatusColor::Red => "31",
            StatusColor::Blue => "34",
            StatusColor::Green => "32",
            StatusColor::Gray => "90",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing for user input: only the known statuses (by wire name or
/// label) are accepted.
impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Status::KNOWN
            .into_iter()
            .find(|status| {
                status.as_str().eq_ignore_ascii_case(trimmed)
                    || status.label().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| {
                anyhow!("invalid status: {trimmed} (expected pending, in_progress or completed)")
            })
    }
}

impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Status::from_wire(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(default, with = "wire_date")]
    pub date: Option<NaiveDate>,

    pub status: Status,
}

/// The editable part of a task: what create and update send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    #[serde(with = "wire_date")]
    pub date: Option<NaiveDate>,
    pub status: Status,
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            date: task.date,
            status: task.status.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
