//! Display projection of the registry: sort, filter, paginate, pad.

use std::cmp::Ordering;

use serde::Serialize;
use shared::domain::{FileRecord, SortDirection, SortKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewControls {
    pub search: String,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl ViewControls {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            sort_key: SortKey::CreatedAt,
            sort_direction: SortDirection::Descending,
            page: 1,
            page_size,
        }
    }
}

impl Default for ViewControls {
    fn default() -> Self {
        Self::new(5)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedPage {
    pub files: Vec<FileRecord>,
    pub padding: usize,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
}

pub fn total_pages(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1))
}

/// Projects `files` (in registry order) through `controls`.
///
/// Assumes `controls.page` is already within range; an out-of-range page
/// yields an empty, fully padded page.
pub fn project(files: &[FileRecord], controls: &ViewControls) -> ProjectedPage {
    let page_size = controls.page_size.max(1);
    let filtered = filter_by_name(sort_files(files, controls), &controls.search);
    let filtered_count = filtered.len();

    let start = controls.page.saturating_sub(1).saturating_mul(page_size);
    let page_files: Vec<FileRecord> = filtered
        .into_iter()
        .skip(start)
        .take(page_size)
        .cloned()
        .collect();

    ProjectedPage {
        padding: page_size - page_files.len(),
        files: page_files,
        page: controls.page,
        total_pages: total_pages(filtered_count, page_size),
        filtered_count,
        total_count: files.len(),
    }
}

pub fn filtered_count(files: &[FileRecord], search: &str) -> usize {
    let needle = search.to_lowercase();
    files
        .iter()
        .filter(|file| matches_name(file, &needle))
        .count()
}

fn sort_files<'a>(files: &'a [FileRecord], controls: &ViewControls) -> Vec<&'a FileRecord> {
    let mut sorted: Vec<&FileRecord> = files.iter().collect();
    sorted.sort_by(|a, b| {
        let ordering = compare_by_key(a, b, controls.sort_key);
        let ordering = match controls.sort_direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        ordering.then_with(|| a.sequence.cmp(&b.sequence))
    });
    sorted
}

fn compare_by_key(a: &FileRecord, b: &FileRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Size => a.size_bytes.cmp(&b.size_bytes),
        SortKey::MediaType => a.media_type.cmp(&b.media_type),
        SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        SortKey::State => a.state.ordinal().cmp(&b.state.ordinal()),
    }
}

fn filter_by_name<'a>(files: Vec<&'a FileRecord>, search: &str) -> Vec<&'a FileRecord> {
    if search.is_empty() {
        return files;
    }
    let needle = search.to_lowercase();
    files
        .into_iter()
        .filter(|file| matches_name(file, &needle))
        .collect()
}

fn matches_name(file: &FileRecord, lowered_needle: &str) -> bool {
    lowered_needle.is_empty() || file.name.to_lowercase().contains(lowered_needle)
}
