//! Hybrid day-grouped pagination for the public notes feed.
//!
//! Notes arrive newest first. They are bucketed by UTC creation date, then
//! packed greedily into pages: a day that fits on a page is never split, a day
//! larger than a page is cut into chunks that fill each page exactly.

use crate::models::{Note, NotesDayGroup, NotesPage};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 10;

/// Build page `page` (1-based) of the feed.
///
/// `page_size` is clamped into `[1, MAX_PAGE_SIZE]` and `page` to `>= 1`.
/// A page past the end has no groups and `has_next = false`.
pub fn paginate_notes(notes: &[Note], page: i64, page_size: i64) -> NotesPage {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE as i64) as usize;
    let page = page.max(1) as usize;

    let pages = build_hybrid_pages(group_by_day(notes), page_size);
    let total_pages = pages.len();
    let groups = pages.into_iter().nth(page - 1).unwrap_or_default();

    NotesPage {
        page,
        page_size,
        has_next: page < total_pages,
        has_prev: page > 1 && total_pages > 0,
        total_pages,
        groups,
    }
}

/// Split an ordered note list into runs sharing a UTC date.
fn group_by_day(notes: &[Note]) -> Vec<NotesDayGroup> {
    let mut groups: Vec<NotesDayGroup> = Vec::new();
    for note in notes {
        let day = note.date_utc();
        match groups.last_mut() {
            Some(last) if last.date_utc == day => last.notes.push(note.clone()),
            _ => groups.push(NotesDayGroup {
                date_utc: day,
                notes: vec![note.clone()],
            }),
        }
    }
    groups
}

/// Page accumulator for the greedy pack-and-split pass
struct PageBuilder {
    page_size: usize,
    pages: Vec<Vec<NotesDayGroup>>,
    current: Vec<NotesDayGroup>,
    count: usize,
}

impl PageBuilder {
    fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Vec::new(),
            count: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.page_size - self.count
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.count = 0;
    }

    /// Append notes for `date_utc`, merging into the page's tail group when it
    /// is the same day.
    fn push_chunk(&mut self, date_utc: &str, chunk: Vec<Note>) {
        if chunk.is_empty() {
            return;
        }
        self.count += chunk.len();
        match self.current.last_mut() {
            Some(last) if last.date_utc == date_utc => last.notes.extend(chunk),
            _ => self.current.push(NotesDayGroup {
                date_utc: date_utc.to_string(),
                notes: chunk,
            }),
        }
    }

    fn add_group(&mut self, group: NotesDayGroup) {
        let size = group.notes.len();

        if size <= self.page_size {
            if self.count > 0 && self.count + size > self.page_size {
                self.flush();
            }
            self.push_chunk(&group.date_utc, group.notes);
            return;
        }

        let NotesDayGroup { date_utc, notes } = group;
        let mut rest = notes.into_iter().peekable();
        while rest.peek().is_some() {
            if self.remaining() == 0 {
                self.flush();
            }
            let chunk: Vec<Note> = rest.by_ref().take(self.remaining()).collect();
            self.push_chunk(&date_utc, chunk);
            if self.count == self.page_size {
                self.flush();
            }
        }
    }

    fn finish(mut self) -> Vec<Vec<NotesDayGroup>> {
        self.flush();
        self.pages
    }
}

fn build_hybrid_pages(groups: Vec<NotesDayGroup>, page_size: usize) -> Vec<Vec<NotesDayGroup>> {
    let mut builder = PageBuilder::new(page_size);
    for group in groups {
        builder.add_group(group);
    }
    builder.finish()
}
