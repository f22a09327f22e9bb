//! Roster Workbook Export
//!
//! Two sheets: `Registrations` (title, event line, one row per record) and
//! `Category Summary` (count and members per category).

use chrono::NaiveDate;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

use crate::error::Result;
use crate::roster::Roster;
use crate::settings::EventSettings;

pub const REGISTRATIONS_SHEET: &str = "Registrations";
pub const SUMMARY_SHEET: &str = "Category Summary";

/// Column header and width for the registrations sheet.
const COLUMNS: [(&str, f64); 8] = [
    ("#", 5.0),
    ("Full Name", 28.0),
    ("Roll No", 16.0),
    ("Department", 24.0),
    ("Batch", 14.0),
    ("Category", 16.0),
    ("Date", 14.0),
    ("Time", 10.0),
];

const SUMMARY_COLUMNS: [(&str, f64); 3] = [("Category", 20.0), ("Count", 10.0), ("Members (Roll No)", 80.0)];

/// First data row of the registrations sheet (zero based).
const FIRST_RECORD_ROW: u32 = 3;

const NAVY: u32 = 0x1E1B4B;
const MIDNIGHT: u32 = 0x0B132B;
const GOLD: u32 = 0xFFD159;
const SKY: u32 = 0x7ECEFD;
const TEXT: u32 = 0xE0E0E0;
const ROW_EVEN: u32 = 0x0F1B35;
const ROW_ODD: u32 = 0x1A2550;
const RULE: u32 = 0x334466;

struct Styles {
    title: Format,
    info: Format,
    header: Format,
    summary_category: Format,
    summary_cell: Format,
}

impl Styles {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_font_size(12)
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(NAVY))
            .set_align(FormatAlign::Center);
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_font_color(Color::RGB(GOLD))
                .set_background_color(Color::RGB(MIDNIGHT))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            info: Format::new()
                .set_font_size(10)
                .set_font_color(Color::RGB(SKY))
                .set_background_color(Color::RGB(NAVY))
                .set_align(FormatAlign::Center),
            header,
            summary_category: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(GOLD))
                .set_background_color(Color::RGB(NAVY)),
            summary_cell: Format::new()
                .set_font_color(Color::RGB(TEXT))
                .set_background_color(Color::RGB(NAVY)),
        }
    }

    /// Striped body cell; the count and the date/time columns are centered.
    fn record_cell(row: u32, col: u16) -> Format {
        let fill = if row % 2 == 0 { ROW_EVEN } else { ROW_ODD };
        let align = match col {
            0 | 5 | 6 | 7 => FormatAlign::Center,
            _ => FormatAlign::Left,
        };
        Format::new()
            .set_font_size(11)
            .set_font_color(Color::RGB(TEXT))
            .set_background_color(Color::RGB(fill))
            .set_border_bottom(rust_xlsxwriter::FormatBorder::Thin)
            .set_border_bottom_color(Color::RGB(RULE))
            .set_align(align)
            .set_align(FormatAlign::VerticalCenter)
    }
}

/// `Date: 2024-05-02  (Thursday)  |  Venue: ...  |  Total: 3`. The weekday
/// is left blank when the event date does not parse.
pub fn event_line(settings: &EventSettings, total: usize) -> String {
    let weekday = NaiveDate::parse_from_str(&settings.event_date, "%Y-%m-%d")
        .map(|d| d.format("%A").to_string())
        .unwrap_or_default();
    format!(
        "Date: {}  ({})  |  Venue: {}  |  Topic: {}  |  Organizer: {}  |  Total: {}",
        settings.event_date,
        weekday,
        settings.event_venue,
        settings.event_topic,
        settings.organizer,
        total
    )
}

impl Roster {
    /// Renders the roster as an xlsx workbook.
    pub fn to_xlsx(&self, settings: &EventSettings) -> Result<Vec<u8>> {
        let styles = Styles::new();
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.registrations_sheet(settings, &styles)?);
        workbook.push_worksheet(self.summary_sheet(&styles)?);
        let bytes = workbook.save_to_buffer()?;
        tracing::debug!(records = self.len(), bytes = bytes.len(), "roster workbook written");
        Ok(bytes)
    }

    fn registrations_sheet(&self, settings: &EventSettings, styles: &Styles) -> Result<Worksheet> {
        let mut sheet = Worksheet::new();
        sheet.set_name(REGISTRATIONS_SHEET)?;
        let last_col = (COLUMNS.len() - 1) as u16;

        let title = format!("  {} - Registration Data", settings.event_name);
        sheet.merge_range(0, 0, 0, last_col, &title, &styles.title)?;
        sheet.set_row_height(0, 34)?;
        sheet.merge_range(1, 0, 1, last_col, &event_line(settings, self.len()), &styles.info)?;
        sheet.set_row_height(1, 18)?;

        for (col, (header, width)) in COLUMNS.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(2, col, *header, &styles.header)?;
            sheet.set_column_width(col, *width)?;
        }
        sheet.set_row_height(2, 22)?;

        for (i, record) in self.records().iter().enumerate() {
            let row = FIRST_RECORD_ROW + i as u32;
            sheet.write_number_with_format(row, 0, (i + 1) as f64, &Styles::record_cell(row, 0))?;
            let values = [
                &record.name,
                &record.roll_no,
                &record.department,
                &record.batch,
                &record.category,
                &record.date,
                &record.time,
            ];
            for (offset, value) in values.into_iter().enumerate() {
                let col = offset as u16 + 1;
                sheet.write_string_with_format(row, col, value.as_str(), &Styles::record_cell(row, col))?;
            }
            sheet.set_row_height(row, 20)?;
        }
        Ok(sheet)
    }

    fn summary_sheet(&self, styles: &Styles) -> Result<Worksheet> {
        let mut sheet = Worksheet::new();
        sheet.set_name(SUMMARY_SHEET)?;
        let last_col = (SUMMARY_COLUMNS.len() - 1) as u16;

        sheet.merge_range(0, 0, 0, last_col, "Category-wise Summary", &styles.title)?;
        sheet.set_row_height(0, 28)?;
        for (col, (header, width)) in SUMMARY_COLUMNS.iter().enumerate() {
            let col = col as u16;
            sheet.write_string_with_format(1, col, *header, &styles.header)?;
            sheet.set_column_width(col, *width)?;
        }

        for (i, entry) in self.summary().iter().enumerate() {
            let row = 2 + i as u32;
            sheet.write_string_with_format(row, 0, entry.category.as_str(), &styles.summary_category)?;
            sheet.write_number_with_format(row, 1, entry.count as f64, &styles.summary_cell)?;
            sheet.write_string_with_format(row, 2, entry.members.join(", "), &styles.summary_cell)?;
        }
        Ok(sheet)
    }
}
