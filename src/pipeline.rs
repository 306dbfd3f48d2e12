//! Sort, filter and paginate a report view. Nothing here mutates its input.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    models::{Report, ReportNote, ReportStatus},
    search::{build_search_mask, normalize_query},
    value_utils::{display_or_dash, excerpt, format_timestamp},
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
const DESCRIPTION_EXCERPT_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Id,
    Reference,
    Date,
    Description,
    Category,
    Status,
    Author,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    One(String),
}

impl CategoryFilter {
    /// Maps the UI sentinel `"all"` (or an empty id) to [`CategoryFilter::All`].
    pub fn from_id(id: &str) -> Self {
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::One(trimmed.to_string())
        }
    }

    fn accepts(&self, report: &Report) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::One(id) => report.category == *id,
        }
    }
}

/// Inclusive calendar-day bounds, compared against the day a report was
/// recorded on so the end day is covered whatever the time or offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_active(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub category: CategoryFilter,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<ReportStatus>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            sort: None,
            category: CategoryFilter::All,
            search: String::new(),
            status: None,
            date_range: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Reports,
    AgentReports,
    Analysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountScope {
    /// KPI counts cover the whole working collection.
    All,
    /// KPI counts cover the collection after the category filter only.
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewPolicy {
    /// An `en_cours` filter also admits `investigation` rows.
    pub groups_in_progress: bool,
    pub count_scope: CountScope,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [ViewKind::Reports, ViewKind::AgentReports, ViewKind::Analysis];

    // only the agent list groups investigation under "in progress"
    pub fn policy(self) -> ViewPolicy {
        match self {
            ViewKind::Reports => ViewPolicy {
                groups_in_progress: false,
                count_scope: CountScope::All,
            },
            ViewKind::AgentReports => ViewPolicy {
                groups_in_progress: true,
                count_scope: CountScope::All,
            },
            ViewKind::Analysis => ViewPolicy {
                groups_in_progress: false,
                count_scope: CountScope::Category,
            },
        }
    }
}

fn status_matches(status: ReportStatus, filter: Option<ReportStatus>, policy: ViewPolicy) -> bool {
    match filter {
        None => true,
        Some(ReportStatus::EnCours) if policy.groups_in_progress => {
            matches!(status, ReportStatus::EnCours | ReportStatus::Investigation)
        }
        Some(wanted) => status == wanted,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KpiCounts {
    pub total: usize,
    pub en_cours: usize,
    pub investigation: usize,
    pub transmis_autorite: usize,
    pub classifier: usize,
    pub unknown: usize,
    /// `en_cours` plus `investigation`.
    pub in_progress: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl KpiCounts {
    fn tally<'a>(reports: impl Iterator<Item = &'a Report>) -> Self {
        let mut counts = KpiCounts::default();
        for report in reports {
            counts.total += 1;
            match report.status {
                ReportStatus::EnCours => counts.en_cours += 1,
                ReportStatus::Investigation => counts.investigation += 1,
                ReportStatus::TransmisAutorite => counts.transmis_autorite += 1,
                ReportStatus::Classifier => counts.classifier += 1,
                ReportStatus::Unknown => counts.unknown += 1,
            }
            *counts
                .by_category
                .entry(report.category.clone())
                .or_insert(0) += 1;
        }
        counts.in_progress = counts.en_cours + counts.investigation;
        counts
    }

    pub fn for_status(&self, status: ReportStatus) -> usize {
        match status {
            ReportStatus::EnCours => self.en_cours,
            ReportStatus::Investigation => self.investigation,
            ReportStatus::TransmisAutorite => self.transmis_autorite,
            ReportStatus::Classifier => self.classifier,
            ReportStatus::Unknown => self.unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub reference: String,
    pub created_at: Option<String>,
    pub date_label: String,
    pub category: String,
    pub category_label: String,
    pub status: ReportStatus,
    pub status_label: String,
    pub author: String,
    pub is_anonymous: bool,
    pub location: String,
    pub description_excerpt: String,
    pub attachment_count: usize,
    pub assigned_to: String,
    pub note: Option<String>,
}

impl ReportRow {
    pub fn from_report(report: &Report) -> Self {
        let created = report.created_at();
        Self {
            id: report.id,
            reference: display_or_dash(Some(report.reference.as_str())),
            created_at: report.created_at.clone(),
            date_label: format_timestamp(created.as_ref()),
            category: report.category.clone(),
            category_label: display_or_dash(Some(report.category_label())),
            status: report.status,
            status_label: report.status.label().to_string(),
            author: report.author_display(),
            is_anonymous: report.is_anonymous,
            location: report.location(),
            description_excerpt: excerpt(&report.description, DESCRIPTION_EXCERPT_CHARS),
            attachment_count: report.files.len(),
            assigned_to: display_or_dash(report.assigned_to.as_deref()),
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage {
    pub rows: Vec<ReportRow>,
    pub total: usize,
    pub total_filtered: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub counts: KpiCounts,
}

impl ListPage {
    pub fn attach_notes(&mut self, notes: &HashMap<i64, ReportNote>) {
        for row in &mut self.rows {
            row.note = notes.get(&row.id).map(|note| note.memo.clone());
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_reports(a: &Report, b: &Report, key: SortKey) -> Ordering {
    match key {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Reference => compare_text(&a.reference, &b.reference),
        SortKey::Description => compare_text(&a.description, &b.description),
        SortKey::Category => compare_text(a.category_label(), b.category_label()),
        SortKey::Author => compare_text(
            a.author_name().unwrap_or_default(),
            b.author_name().unwrap_or_default(),
        ),
        SortKey::Status => a.status.cmp(&b.status),
        // unparsable dates sort before every real date
        SortKey::Date => match (a.created_at(), b.created_at()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Indices of `reports` ordered by `sort`. Ties keep source order in both directions.
pub fn sorted_indices(reports: &[Report], sort: Option<SortSpec>) -> Vec<usize> {
    let mut ordered: Vec<usize> = (0..reports.len()).collect();
    if let Some(spec) = sort {
        // `sort_by` is stable; the direction flips the comparator, never the vector
        ordered.sort_by(|&a, &b| {
            let ord = compare_reports(&reports[a], &reports[b], spec.key);
            match spec.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }
    ordered
}

pub fn select(reports: &[Report], query: &ListQuery, policy: ViewPolicy) -> Vec<usize> {
    let ordered = sorted_indices(reports, query.sort);

    let date_range = query.date_range.filter(DateRange::is_active);
    let scoped: Vec<usize> = ordered
        .into_iter()
        .filter(|&idx| query.category.accepts(&reports[idx]))
        .filter(|&idx| match &date_range {
            None => true,
            Some(range) => reports[idx]
                .created_on()
                .map(|date| range.contains(date))
                .unwrap_or(false),
        })
        .collect();

    let needle = normalize_query(&query.search);
    let mask = build_search_mask(reports, &scoped, &needle);

    scoped
        .into_iter()
        .zip(mask)
        .filter(|&(idx, matched)| matched && status_matches(reports[idx].status, query.status, policy))
        .map(|(idx, _)| idx)
        .collect()
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    total.div_ceil(size).max(1)
}

pub fn run(reports: &[Report], query: &ListQuery, policy: ViewPolicy) -> ListPage {
    let filtered = select(reports, query, policy);
    let page_size = query.page_size.max(1);
    let pages = page_count(filtered.len(), page_size);
    let page = if query.page == 0 || query.page > pages {
        debug!(requested = query.page, pages, "page out of range, resetting to 1");
        1
    } else {
        query.page
    };

    let start = (page - 1) * page_size;
    let rows: Vec<ReportRow> = filtered
        .iter()
        .skip(start)
        .take(page_size)
        .map(|&idx| ReportRow::from_report(&reports[idx]))
        .collect();

    let counts = match policy.count_scope {
        CountScope::All => KpiCounts::tally(reports.iter()),
        CountScope::Category => {
            KpiCounts::tally(reports.iter().filter(|report| query.category.accepts(report)))
        }
    };

    ListPage {
        rows,
        total: reports.len(),
        total_filtered: filtered.len(),
        page,
        page_size,
        page_count: pages,
        counts,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status filter: {0}")]
pub struct UnknownStatus(pub String);

/// `None` or a blank value clears the filter.
fn parse_status_filter(raw: Option<&str>) -> Result<Option<ReportStatus>, UnknownStatus> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => ReportStatus::parse(value)
            .map(Some)
            .ok_or_else(|| UnknownStatus(value.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListUpdate {
    Search { text: String },
    Category { id: String },
    Status { status: Option<String> },
    DateRange { start: Option<NaiveDate>, end: Option<NaiveDate> },
    Sort { key: SortKey },
    Page { page: usize },
    PageSize { size: usize },
    Reset,
}

/// Query state of one list view. Changing any filter, the sort, or the page
/// size sends the view back to page 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListState {
    query: ListQuery,
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn set_search(&mut self, text: &str) {
        self.query.search = text.to_string();
        self.query.page = 1;
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.query.category = category;
        self.query.page = 1;
    }

    pub fn set_status(&mut self, status: Option<ReportStatus>) {
        self.query.status = status;
        self.query.page = 1;
    }

    pub fn set_date_range(&mut self, range: Option<DateRange>) {
        self.query.date_range = range.filter(DateRange::is_active);
        self.query.page = 1;
    }

    /// Selecting the active key again flips its direction.
    pub fn sort_by(&mut self, key: SortKey) {
        self.query.sort = Some(match self.query.sort {
            Some(current) if current.key == key => SortSpec {
                key,
                direction: current.direction.toggled(),
            },
            _ => SortSpec {
                key,
                direction: SortDirection::Asc,
            },
        });
        self.query.page = 1;
    }

    pub fn set_page_size(&mut self, size: usize) {
        self.query.page_size = size.max(1);
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.query.page = page.max(1);
    }

    /// Applies one control change. An unrecognized status leaves the view untouched.
    pub fn apply(&mut self, update: ListUpdate) -> Result<(), UnknownStatus> {
        match update {
            ListUpdate::Search { text } => self.set_search(&text),
            ListUpdate::Category { id } => self.set_category(CategoryFilter::from_id(&id)),
            ListUpdate::Status { status } => self.set_status(parse_status_filter(status.as_deref())?),
            ListUpdate::DateRange { start, end } => {
                self.set_date_range(Some(DateRange { start, end }))
            }
            ListUpdate::Sort { key } => self.sort_by(key),
            ListUpdate::Page { page } => self.set_page(page),
            ListUpdate::PageSize { size } => self.set_page_size(size),
            ListUpdate::Reset => *self = ListState::new(),
        }
        Ok(())
    }

    pub fn run(&mut self, reports: &[Report], policy: ViewPolicy) -> ListPage {
        let page = run(reports, &self.query, policy);
        self.query.page = page.page;
        page
    }
}
