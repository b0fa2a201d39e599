use crate::models::{PropertyListItem, PropertyPage, PropertyStatus};
use crate::view::selection::Selection;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const NAME_WIDTH: usize = 28;
const DESTINATION_WIDTH: usize = 16;
const CARD_WIDTH: usize = 48;

/// How the current result set is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Table,
    VirtualizedTable,
    Grid,
}

/// Draws one page of results as text lines
pub trait Renderer {
    fn render(&self, page: &PropertyPage, selection: &Selection) -> Vec<String>;
}

fn checkbox(selection: &Selection, item: &PropertyListItem) -> &'static str {
    if selection.contains(&item.id) {
        "[x]"
    } else {
        "[ ]"
    }
}

fn status_label(status: PropertyStatus) -> &'static str {
    match status {
        PropertyStatus::Published => "published",
        PropertyStatus::Hidden => "hidden",
    }
}

/// Cut `s` to at most `max_width` display columns, marking the cut with `…`
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;
    let limit = max_width.saturating_sub(1);
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > limit {
            break;
        }
        result.push(c);
        current_width += char_width;
    }
    result.push('…');
    result
}

/// Truncate and pad to exactly `width` display columns. `format!` padding
/// counts chars, which misaligns wide (CJK) text.
fn fit_column(s: &str, width: usize) -> String {
    let cell = truncate_to_width(s, width);
    let padding = " ".repeat(width.saturating_sub(cell.width()));
    cell + &padding
}

fn table_header() -> String {
    format!(
        "    {} {} {:<10} {:>5} {:>5} {:>6} {:>8}  {}",
        fit_column("Name", NAME_WIDTH),
        fit_column("Destination", DESTINATION_WIDTH),
        "Type",
        "Rooms",
        "Baths",
        "Guests",
        "Price",
        "Status"
    )
}

fn table_row(item: &PropertyListItem, selection: &Selection) -> String {
    format!(
        "{} {} {} {:<10} {:>5} {:>5} {:>6} {:>8}  {}",
        checkbox(selection, item),
        fit_column(&item.name, NAME_WIDTH),
        fit_column(&item.destination_name, DESTINATION_WIDTH),
        item.property_type.as_str(),
        item.rooms,
        item.bathrooms,
        item.max_guests,
        item.price,
        status_label(item.status)
    )
}

/// Plain table: every row of the page
pub struct TableRenderer;

impl Renderer for TableRenderer {
    fn render(&self, page: &PropertyPage, selection: &Selection) -> Vec<String> {
        std::iter::once(table_header())
            .chain(page.data.iter().map(|item| table_row(item, selection)))
            .collect()
    }
}

/// Table that only materializes the rows inside the visible window
pub struct VirtualizedTableRenderer {
    pub offset: usize,
    pub viewport_rows: usize,
}

impl VirtualizedTableRenderer {
    pub fn new(viewport_rows: usize) -> Self {
        Self {
            offset: 0,
            viewport_rows,
        }
    }

    pub fn scrolled_to(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl Renderer for VirtualizedTableRenderer {
    fn render(&self, page: &PropertyPage, selection: &Selection) -> Vec<String> {
        let len = page.data.len();
        let start = self.offset.min(len);
        let end = (start + self.viewport_rows).min(len);

        let mut lines = vec![table_header()];
        lines.extend(
            page.data[start..end]
                .iter()
                .map(|item| table_row(item, selection)),
        );
        if start < end {
            lines.push(format!("rows {}-{} of {}", start + 1, end, len));
        }
        lines
    }
}

/// Cards laid out `columns` per line, each padded to the same display width
pub struct GridRenderer {
    pub columns: usize,
}

impl Renderer for GridRenderer {
    fn render(&self, page: &PropertyPage, selection: &Selection) -> Vec<String> {
        page.data
            .chunks(self.columns.max(1))
            .map(|row| {
                row.iter()
                    .map(|item| {
                        let card = format!(
                            "{} {} ({}, {} rooms, {})",
                            checkbox(selection, item),
                            item.name,
                            item.destination_name,
                            item.rooms,
                            item.price
                        );
                        fit_column(&card, CARD_WIDTH)
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect()
    }
}
