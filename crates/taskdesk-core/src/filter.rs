use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::debug;

use crate::api::TaskApi;
use crate::datetime::parse_user_date;
use crate::list::{FetchOutcome, ListController};
use crate::task::Status;

/// The applied filter set. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<Status>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none() && self.status.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Title,
    Date,
    Status,
}

impl FilterField {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::Title => "title",
            FilterField::Date => "date",
            FilterField::Status => "status",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(FilterField::Title),
            "date" => Ok(FilterField::Date),
            "status" => Ok(FilterField::Status),
            other => Err(anyhow!("unknown filter field: {other} (expected title, date or status)")),
        }
    }
}

/// Working draft of the filter toolbar, kept apart from the filter set the
/// list controller holds until `apply` is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    title: String,
    date: Option<NaiveDate>,
    status: Option<Status>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn status(&self) -> Option<&Status> {
        self.status.as_ref()
    }

    /// Sets one draft field from text. An empty value clears the field; a
    /// value that does not parse leaves the draft untouched.
    pub fn set_field(&mut self, field: FilterField, value: &str) -> anyhow::Result<()> {
        let blank = value.trim().is_empty();
        match field {
            FilterField::Title => self.title = value.to_string(),
            FilterField::Date if blank => self.date = None,
            FilterField::Date => self.date = Some(parse_user_date(value)?),
            FilterField::Status if blank => self.status = None,
            FilterField::Status => self.status = Some(value.parse()?),
        }
        debug!(field = %field, value, "updated filter draft");
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    pub fn set_status(&mut self, status: Option<Status>) {
        self.status = status;
    }

    pub fn has_active_filters(&self) -> bool {
        !self.title.is_empty() || self.date.is_some() || self.status.is_some()
    }

    /// The draft as a filter set: empty fields become absent.
    pub fn normalized(&self) -> TaskFilter {
        TaskFilter {
            title: (!self.title.is_empty()).then(|| self.title.clone()),
            date: self.date,
            status: self.status.clone(),
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn apply<A: TaskApi>(&self, list: &mut ListController<A>) -> FetchOutcome {
        list.apply_filter(self.normalized()).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn reset<A: TaskApi>(&mut self, list: &mut ListController<A>) -> FetchOutcome {
        *self = Self::default();
        list.apply_filter(TaskFilter::default()).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{FilterField, FilterState, TaskFilter};
    use crate::task::Status;

    #[test]
    fn empty_draft_normalizes_to_no_constraints() {
        let state = FilterState::new();
        assert!(!state.has_active_filters());
        assert_eq!(state.normalized(), TaskFilter::default());
        assert!(state.normalized().is_empty());
    }

    #[test]
    fn set_field_parses_text() {
        let mut state = FilterState::new();
        state.set_field(FilterField::Title, "milk").expect("title");
        state.set_field(FilterField::Date, "15/03/2024").expect("date");
        state.set_field(FilterField::Status, "completed").expect("status");

        assert!(state.has_active_filters());
        assert_eq!(
            state.normalized(),
            TaskFilter {
                title: Some("milk".to_string()),
                date: NaiveDate::from_ymd_opt(2024, 3, 15),
                status: Some(Status::Completed),
            }
        );

        state.set_field(FilterField::Status, "").expect("clear status");
        assert_eq!(state.status(), None);
    }

    #[test]
    fn bad_values_leave_the_draft_untouched() {
        let mut state = FilterState::new();
        state.set_field(FilterField::Date, "2024-01-01").expect("date");
        assert!(state.set_field(FilterField::Date, "someday").is_err());
        assert!(state.set_field(FilterField::Status, "archived").is_err());
        assert_eq!(state.date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(state.status(), None);
        assert!("priority".parse::<FilterField>().is_err());
    }

    #[test]
    fn whitespace_title_counts_as_active() {
        let mut state = FilterState::new();
        state.set_title(" ");
        assert!(state.has_active_filters());
        assert_eq!(state.normalized().title.as_deref(), Some(" "));
    }
}
