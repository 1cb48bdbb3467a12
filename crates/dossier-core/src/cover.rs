//! The cover: a summary of the application and profile, placed before the
//! body pages.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime};
use lopdf::Document;
use tracing::{debug, warn};

use crate::config::{LayoutConfig, PageSize, TextColor};
use crate::error::Result;
use crate::fetch::ResourceFetcher;
use crate::model::{ApplicationData, non_empty};
use crate::pdf::{EmbeddedFont, PageCanvas, PreparedImage, TextStyle, fit_within};
use crate::util::run_blocking;

const TOP: f32 = 20.0;
const LEFT_MARGIN: f32 = 15.0;
const RIGHT_MARGIN: f32 = 15.0;
const VALUE_COLUMN: f32 = 55.0;
const LINE_HEIGHT: f32 = 7.0;
/// A section header needs at least this much room above the bottom edge.
const SECTION_RESERVE: f32 = 30.0;
/// A field line needs at least this much room above the bottom edge.
const FIELD_RESERVE: f32 = 20.0;
const SECTION_HEADER_GAP: f32 = 8.0;
const SECTION_GAP: f32 = 5.0;
const PICTURE_MAX_HEIGHT: f32 = 35.0;
const PICTURE_GAP: f32 = 8.0;
const NAME_GAP: f32 = 15.0;
const TITLE_GAP: f32 = 15.0;
const FOOTER_OFFSET: f32 = 15.0;

const TITLE: &str = "APPLICATION DETAILS";

/// One titled block of label/value rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl Section {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            fields: Vec::new(),
        }
    }

    /// Add a row unless the value is missing or blank.
    fn field(&mut self, label: &'static str, value: Option<impl AsRef<str>>) -> &mut Self {
        if let Some(value) = value {
            let value = value.as_ref().trim();
            if !value.is_empty() {
                self.fields.push((label, value.to_string()));
            }
        }
        self
    }
}

/// Renders the cover page(s) as a standalone document.
pub struct CoverPageRenderer<'a> {
    page_size: PageSize,
    accent: TextColor,
    font: Option<&'a EmbeddedFont>,
    generated_on: NaiveDate,
}

impl<'a> CoverPageRenderer<'a> {
    pub fn new(layout: &LayoutConfig, font: Option<&'a EmbeddedFont>) -> Self {
        Self {
            page_size: layout.page_size,
            accent: layout.accent,
            font,
            generated_on: Local::now().date_naive(),
        }
    }

    /// Date stamped in the footer and used for the age row.
    #[must_use]
    pub const fn generated_on(mut self, date: NaiveDate) -> Self {
        self.generated_on = date;
        self
    }

    /// Lay out the cover. `picture` is the decoded profile picture, if it
    /// could be fetched; without it a plain title heads the page.
    pub fn render(&self, data: &ApplicationData, picture: Option<PreparedImage>) -> Result<Document> {
        let mut canvas = PageCanvas::new(self.page_size, self.font);
        let page_width = canvas.page_width();
        let page_height = canvas.page_height();
        let mut y = TOP;

        if let Some(picture) = picture {
            let (px_width, px_height) = picture.dimensions();
            let (width, height) = fit_within(
                px_width as f32,
                px_height as f32,
                page_width - LEFT_MARGIN - RIGHT_MARGIN,
                PICTURE_MAX_HEIGHT,
            );
            canvas.image(picture, (page_width - width) / 2.0, y, width, height);
            y += height + PICTURE_GAP;

            if let Some(name) = data.profile.full_name() {
                let style = TextStyle::new(16.0).bold().color(TextColor::heading());
                canvas.text_centered(name, y, &style);
                y += NAME_GAP;
            }
        } else {
            canvas.text_centered(TITLE, y, &TextStyle::new(18.0).color(self.accent));
            y += TITLE_GAP;
        }

        let header_style = TextStyle::new(12.0).bold().color(self.accent);
        let label_style = TextStyle::new(9.0).color(TextColor::muted());
        let value_style = TextStyle::new(9.0);
        let value_x = LEFT_MARGIN + VALUE_COLUMN;
        let value_width = page_width - RIGHT_MARGIN - value_x;

        for section in self.sections(data) {
            if y > page_height - SECTION_RESERVE {
                canvas.add_page();
                y = TOP;
            }
            canvas.text(section.title, LEFT_MARGIN, y, &header_style);
            y += SECTION_HEADER_GAP;

            for (label, value) in &section.fields {
                if y > page_height - FIELD_RESERVE {
                    canvas.add_page();
                    y = TOP;
                }
                canvas.text(&format!("{label}:"), LEFT_MARGIN, y, &label_style);

                // Long values continue on the next page
                for line in canvas.wrap(value, &value_style, value_width) {
                    if y > page_height - FIELD_RESERVE {
                        canvas.add_page();
                        y = TOP;
                    }
                    canvas.text(&line, value_x, y, &value_style);
                    y += LINE_HEIGHT;
                }
            }

            y += SECTION_GAP;
        }

        let footer = format!("Generated on {}", long_date(self.generated_on));
        let footer_style = TextStyle::new(8.0).color(TextColor::muted());
        canvas.text_centered(&footer, page_height - FOOTER_OFFSET, &footer_style);

        debug!("Cover laid out on {} page(s)", canvas.page_count());
        canvas.finish()
    }

    /// The cover's sections and rows, in drawing order.
    pub fn sections(&self, data: &ApplicationData) -> Vec<Section> {
        let application = &data.application;
        let profile = &data.profile;
        let basic = profile.basic.as_ref();

        let mut sections = Vec::new();

        let mut section = Section::new("APPLICATION INFORMATION");
        section
            .field("Application ID", non_empty(application.id.as_ref()))
            .field(
                "Status",
                application.status.as_ref().map(|s| s.display_label()),
            )
            .field("Submitted At", application.submitted_at.as_deref().map(format_date))
            .field("Created At", application.created_at.as_deref().map(format_date))
            .field("Rejection Reason", application.rejection_reason.as_ref())
            .field("Admin Notes", application.admin_notes.as_ref())
            .field("Remark", application.remark_text.as_ref());
        sections.push(section);

        let mut section = Section::new("BASIC INFORMATION");
        let date_of_birth = basic.and_then(|b| non_empty(b.date_of_birth.as_ref()));
        section
            .field("Full Name", profile.full_name())
            .field("Email", basic.and_then(|b| b.email.as_ref()))
            .field("Phone", basic.and_then(|b| b.phone.as_ref()))
            .field("Date of Birth", date_of_birth.map(format_date))
            .field(
                "Age",
                date_of_birth
                    .and_then(parse_date)
                    .and_then(|dob| age_on(dob, self.generated_on))
                    .map(|age| format!("{age} years")),
            );
        sections.push(section);

        let identity = profile.identity.as_ref();
        let mut section = Section::new("IDENTITY INFORMATION");
        section
            .field("Identity Number", identity.and_then(|i| i.number.as_ref()))
            .field(
                "Identity Documents",
                identity
                    .map(|i| i.doc_files.len())
                    .filter(|&n| n > 0)
                    .map(|n| format!("{n} file(s) uploaded")),
            );
        sections.push(section);

        let address = profile.address.as_ref();
        let mut section = Section::new("ADDRESS INFORMATION");
        section
            .field(
                "Present Address",
                address.and_then(|a| a.present.as_ref()).and_then(|a| a.joined()),
            )
            .field(
                "Permanent Address",
                address.and_then(|a| a.permanent.as_ref()).and_then(|a| a.joined()),
            );
        sections.push(section);

        let other = profile.other.as_ref();
        let mut section = Section::new("OTHER INFORMATION");
        section
            .field("Father's Name", other.and_then(|o| o.fathers_name.as_ref()))
            .field("Mother's Name", other.and_then(|o| o.mothers_name.as_ref()))
            .field("Religion", other.and_then(|o| o.religion.as_ref()))
            .field("Gender", other.and_then(|o| o.gender.as_ref()))
            .field("Marital Status", other.and_then(|o| o.marital_status.as_ref()));
        sections.push(section);

        let contact = profile.emergency_contact.as_ref();
        let mut section = Section::new("EMERGENCY CONTACT");
        section
            .field("Name", contact.and_then(|c| c.name.as_ref()))
            .field("Phone", contact.and_then(|c| c.phone.as_ref()))
            .field("Relation", contact.and_then(|c| c.relation.as_ref()));
        sections.push(section);

        if let Some(work) = &profile.work_info {
            let mut section = Section::new("WORK INFORMATION");
            section
                .field("Employee ID", work.employee_id.as_ref())
                .field("Project Name", work.project_name.as_ref())
                .field("Branch", work.branch.as_ref())
                .field("Shift", work.shift.as_ref())
                .field("Reference", work.reference.as_ref());
            sections.push(section);
        }

        sections
    }
}

/// Fetch and decode the profile picture; failures are logged and dropped.
pub async fn load_picture(fetcher: &dyn ResourceFetcher, url: &str) -> Option<PreparedImage> {
    let bytes = match fetcher.fetch(url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cover without profile picture: {}", e);
            return None;
        }
    };

    let source_url = url.to_string();
    run_blocking(move || PreparedImage::decode(&bytes, &source_url))
        .await
        .inspect_err(|e| warn!("Cover without profile picture: {}", e))
        .ok()
}

/// Accepts RFC 3339 timestamps, naive ISO date-times and plain dates.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Long form (`January 5, 2024`), or the input as given when unparseable.
fn format_date(value: &str) -> String {
    parse_date(value).map_or_else(|| value.trim().to_string(), long_date)
}

/// Whole years from `birth` to `on`; `None` for a birth date in the future.
fn age_on(birth: NaiveDate, on: NaiveDate) -> Option<u32> {
    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{
        Address, AddressInfo, ApplicationRecord, ApplicationStatus, BasicInfo, ProfileRecord, WorkInfo,
    };
    use crate::pdf::font::tests::synthetic_font;
    use crate::pdf::page_texts;

    fn sample() -> ApplicationData {
        ApplicationData {
            application: ApplicationRecord {
                id: Some("65f0c2a9e4b0a1b2c3d4e5f6".to_string()),
                status: Some(ApplicationStatus::UnderReview),
                submitted_at: Some("2024-01-05T09:30:00.000Z".to_string()),
                admin_notes: Some("   ".to_string()),
                ..Default::default()
            },
            profile: ProfileRecord {
                basic: Some(BasicInfo {
                    full_name: Some("Rahim Uddin".to_string()),
                    email: Some("rahim@example.com".to_string()),
                    date_of_birth: Some("1995-06-15".to_string()),
                    ..Default::default()
                }),
                address: Some(AddressInfo {
                    present: Some(Address {
                        street: Some("বাড়ি ১২, রোড ৫".to_string()),
                        upazila: Some("মিরপুর".to_string()),
                        district: Some("ঢাকা".to_string()),
                    }),
                    permanent: None,
                }),
                ..Default::default()
            },
        }
    }

    fn renderer(font: Option<&EmbeddedFont>) -> CoverPageRenderer<'_> {
        CoverPageRenderer::new(&LayoutConfig::default(), font)
            .generated_on(NaiveDate::from_ymd_opt(2024, 6, 14).unwrap())
    }

    fn rows(section: &Section) -> Vec<(&str, &str)> {
        section.fields.iter().map(|(l, v)| (*l, v.as_str())).collect()
    }

    #[test]
    fn test_sections_and_rows() {
        let sections = renderer(None).sections(&sample());
        let titles: Vec<&str> = sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            [
                "APPLICATION INFORMATION",
                "BASIC INFORMATION",
                "IDENTITY INFORMATION",
                "ADDRESS INFORMATION",
                "OTHER INFORMATION",
                "EMERGENCY CONTACT",
            ]
        );

        assert_eq!(
            rows(&sections[0]),
            [
                ("Application ID", "65f0c2a9e4b0a1b2c3d4e5f6"),
                ("Status", "UNDER REVIEW"),
                ("Submitted At", "January 5, 2024"),
            ]
        );
        assert_eq!(
            rows(&sections[1]),
            [
                ("Full Name", "Rahim Uddin"),
                ("Email", "rahim@example.com"),
                ("Date of Birth", "June 15, 1995"),
                ("Age", "28 years"),
            ]
        );
        assert!(sections[2].fields.is_empty());
        assert_eq!(
            rows(&sections[3]),
            [("Present Address", "বাড়ি ১২, রোড ৫, মিরপুর, ঢাকা")]
        );
    }

    #[test]
    fn test_work_section_only_when_present() {
        let mut data = sample();
        data.profile.work_info = Some(WorkInfo {
            branch: Some("Gulshan".to_string()),
            ..Default::default()
        });
        let sections = renderer(None).sections(&data);
        let work = sections.last().unwrap();
        assert_eq!(work.title, "WORK INFORMATION");
        assert_eq!(rows(work), [("Branch", "Gulshan")]);
    }

    #[test]
    fn test_dates() {
        assert_eq!(format_date("2023-12-01"), "December 1, 2023");
        assert_eq!(format_date("2023-12-01T23:10:00+06:00"), "December 1, 2023");
        assert_eq!(format_date("sometime in 2023"), "sometime in 2023");

        let birth = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 6, 14).unwrap()), Some(23));
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), Some(24));
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()), None);
    }

    #[test]
    fn test_render_without_picture() {
        let mut doc = renderer(None).render(&sample(), None).unwrap();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let texts = page_texts(&bytes);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("APPLICATION DETAILS APPLICATION INFORMATION"));
        assert!(texts[0].contains("Application ID: 65f0c2a9e4b0a1b2c3d4e5f6"));
        assert!(texts[0].ends_with("Generated on June 14, 2024"));
    }

    #[test]
    fn test_bengali_values_use_embedded_font() {
        let font = synthetic_font();
        let doc = renderer(Some(&font)).render(&sample(), None).unwrap();

        let type0 = doc.objects.values().any(|o| {
            o.as_dict()
                .and_then(|d| d.get(b"Subtype"))
                .is_ok_and(|s| s.as_name().is_ok_and(|n| n == b"Type0"))
        });
        assert!(type0);
    }

    #[test]
    fn test_long_notes_paginate() {
        let mut data = sample();
        data.application.admin_notes = Some("Checked references and documents. ".repeat(120));

        let doc = renderer(None).render(&data, None).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }
}
