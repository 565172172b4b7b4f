/// Detail panel: editors for the selected record
///
/// The inputs are kept as raw strings so half-typed values survive between
/// keystrokes. They are parsed and validated on every change; while the
/// draft is invalid the Apply button stays disabled.

use iced::widget::{button, column, row, text, text_input, Column};
use iced::{Element, Length};

use herbarium::state::edit::{map_link, validate_qr_text};
use herbarium::state::{Coordinates, Edit, ImageRecord, Thresholds};
use herbarium::Settings;

use super::Tab;
use crate::Message;

/// Which text field changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Low,
    High,
    QrText,
    Latitude,
    Longitude,
    Link,
}

/// Editable values for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub low: String,
    pub high: String,
    pub qr_text: String,
    pub latitude: String,
    pub longitude: String,
    pub link: String,
    /// Last rejection reported by the orchestrator
    pub rejected: Option<String>,
}

impl Draft {
    /// Start from the record's current artifacts (or the defaults)
    pub fn for_record(record: &ImageRecord, settings: &Settings) -> Self {
        let thresholds = record.thresholds().unwrap_or(settings.default_thresholds);
        let (latitude, longitude, link) = match &record.qr_location {
            Some(result) => (
                result.location.coordinates.latitude.to_string(),
                result.location.coordinates.longitude.to_string(),
                result.location.link.clone(),
            ),
            None => Default::default(),
        };

        Self {
            low: thresholds.low.to_string(),
            high: thresholds.high.to_string(),
            qr_text: record
                .qr_text
                .as_ref()
                .map(|result| result.text.clone())
                .unwrap_or_default(),
            latitude,
            longitude,
            link,
            rejected: None,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Low => &mut self.low,
            Field::High => &mut self.high,
            Field::QrText => &mut self.qr_text,
            Field::Latitude => &mut self.latitude,
            Field::Longitude => &mut self.longitude,
            Field::Link => &mut self.link,
        };
        *slot = value;
        self.rejected = None;
    }

    /// Parse the fields belonging to `tab` into an edit
    pub fn edit(&self, tab: Tab, settings: &Settings) -> Result<Edit, String> {
        match tab {
            Tab::Edge => {
                let low = parse::<f32>(&self.low, "low threshold")?;
                let high = parse::<f32>(&self.high, "high threshold")?;
                let thresholds = Thresholds::new(low, high);
                thresholds
                    .validate(settings.threshold_max)
                    .map_err(|err| err.to_string())?;
                Ok(Edit::Thresholds(thresholds))
            }
            Tab::Qr => {
                validate_qr_text(&self.qr_text).map_err(|err| err.to_string())?;
                Ok(Edit::QrText(self.qr_text.clone()))
            }
            Tab::Gps => {
                let coordinates = Coordinates::new(
                    parse::<f64>(&self.latitude, "latitude")?,
                    parse::<f64>(&self.longitude, "longitude")?,
                );
                coordinates.validate().map_err(|err| err.to_string())?;
                let link = self.link.trim();
                if !link.is_empty() {
                    validate_qr_text(link).map_err(|err| err.to_string())?;
                }
                Ok(Edit::Location {
                    coordinates,
                    link: (!link.is_empty()).then(|| link.to_string()),
                })
            }
            Tab::Image => Err("nothing to edit on this tab".into()),
        }
    }
}

fn parse<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{what} must be a number"))
}

/// Build the panel for the selected record
pub fn view<'a>(
    record: &'a ImageRecord,
    draft: &'a Draft,
    tab: Tab,
    settings: &'a Settings,
) -> Element<'a, Message> {
    let mut panel: Column<Message> = column![text(&record.name).size(20)].spacing(12);

    panel = match tab {
        Tab::Image => panel
            .push(text(format!("Orientation: {}", record.orientation)))
            .push(text(if record.is_loaded() { "Loaded" } else { "Loading..." })),
        Tab::Edge => panel.push(
            row![
                labelled("Low", &draft.low, Field::Low),
                labelled("High", &draft.high, Field::High),
            ]
            .spacing(8),
        ),
        Tab::Qr => panel.push(labelled("Text", &draft.qr_text, Field::QrText)),
        Tab::Gps => {
            let hint = match Coordinates::new(
                draft.latitude.trim().parse().unwrap_or(f64::NAN),
                draft.longitude.trim().parse().unwrap_or(f64::NAN),
            ) {
                coordinates if coordinates.validate().is_ok() => {
                    map_link(&settings.map_link_base, coordinates)
                }
                _ => "Map link".to_string(),
            };
            panel
                .push(
                    row![
                        labelled("Latitude", &draft.latitude, Field::Latitude),
                        labelled("Longitude", &draft.longitude, Field::Longitude),
                    ]
                    .spacing(8),
                )
                .push(
                    text_input(&hint, &draft.link)
                        .on_input(|value| Message::FieldChanged(Field::Link, value))
                        .padding(6),
                )
        }
    };

    if tab != Tab::Image {
        let parsed = draft.edit(tab, settings);
        let problem = parsed.as_ref().err().cloned().or_else(|| draft.rejected.clone());

        if let Some(problem) = problem {
            panel = panel.push(text(problem).size(13).style(text::danger));
        }
        panel = panel.push(
            button("Apply")
                .on_press_maybe(parsed.ok().filter(|_| record.is_loaded()).map(|_| Message::Apply))
                .padding(8),
        );
    }

    panel.width(Length::Fill).into()
}

fn labelled<'a>(label: &'a str, value: &'a str, field: Field) -> Element<'a, Message> {
    column![
        text(label).size(12),
        text_input(label, value)
            .on_input(move |value| Message::FieldChanged(field, value))
            .padding(6),
    ]
    .spacing(4)
    .into()
}
