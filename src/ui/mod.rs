/// Desktop shell widgets
///
/// - `detail.rs` - editors for the selected record
/// - the gallery grid and tab bar live here

pub mod detail;

use iced::widget::{button, column, container, image, row, text, Row, Space};
use iced::{Alignment, Element, Length};
use std::sync::Arc;

use herbarium::state::ImageRecord;
use herbarium::DataUri;

use crate::Message;

/// Tiles per gallery row
pub const GALLERY_COLUMNS: usize = 4;

const TILE_HEIGHT: f32 = 180.0;

/// Which artifact the gallery shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Image,
    Gps,
    Qr,
    Edge,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Image, Tab::Gps, Tab::Qr, Tab::Edge];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Image => "Image",
            Tab::Gps => "GPS",
            Tab::Qr => "QR",
            Tab::Edge => "Edge",
        }
    }

    /// Placeholder text while the tab's artifact is absent
    fn placeholder(self, record: &ImageRecord) -> &'static str {
        if !record.is_loaded() {
            return "Loading...";
        }
        match self {
            Tab::Image => "Unreadable",
            Tab::Gps => "No location",
            Tab::Qr => "No QR text",
            Tab::Edge => "Rendering...",
        }
    }
}

/// Decoded image handles for one record snapshot
///
/// Rebuilt only when the record's `Arc` changes, and then only the
/// renderings that actually differ are decoded again.
#[derive(Debug, Clone)]
pub struct Tile {
    pub record: Arc<ImageRecord>,
    source: Option<image::Handle>,
    edge: Option<image::Handle>,
    qr_text: Option<image::Handle>,
    qr_location: Option<image::Handle>,
}

impl Tile {
    pub fn new(record: Arc<ImageRecord>) -> Self {
        Self {
            source: record.raw_source.as_ref().and_then(handle),
            edge: record.edge.as_ref().and_then(|r| handle(&r.rendering)),
            qr_text: record.qr_text.as_ref().and_then(|r| handle(&r.rendering)),
            qr_location: record.qr_location.as_ref().and_then(|r| handle(&r.rendering)),
            record,
        }
    }

    /// Same as `new`, reusing this tile's handles for unchanged renderings
    pub fn update(&self, record: Arc<ImageRecord>) -> Self {
        let old = &self.record;
        Self {
            source: reuse(&self.source, old.raw_source.as_ref(), record.raw_source.as_ref()),
            edge: reuse(
                &self.edge,
                old.edge.as_ref().map(|r| &r.rendering),
                record.edge.as_ref().map(|r| &r.rendering),
            ),
            qr_text: reuse(
                &self.qr_text,
                old.qr_text.as_ref().map(|r| &r.rendering),
                record.qr_text.as_ref().map(|r| &r.rendering),
            ),
            qr_location: reuse(
                &self.qr_location,
                old.qr_location.as_ref().map(|r| &r.rendering),
                record.qr_location.as_ref().map(|r| &r.rendering),
            ),
            record,
        }
    }

    fn artifact(&self, tab: Tab) -> Option<&image::Handle> {
        match tab {
            Tab::Image => self.source.as_ref(),
            Tab::Gps => self.qr_location.as_ref(),
            Tab::Qr => self.qr_text.as_ref(),
            Tab::Edge => self.edge.as_ref(),
        }
    }
}

fn handle(uri: &DataUri) -> Option<image::Handle> {
    match uri.decode() {
        Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
        Err(err) => {
            tracing::warn!(error = %err, "undisplayable rendering");
            None
        }
    }
}

fn reuse(
    cached: &Option<image::Handle>,
    old: Option<&DataUri>,
    new: Option<&DataUri>,
) -> Option<image::Handle> {
    match new {
        Some(uri) if old == Some(uri) => cached.clone(),
        Some(uri) => handle(uri),
        None => None,
    }
}

/// Bring the tile cache in line with a new snapshot
pub fn refresh(tiles: &mut Vec<Tile>, records: &[Arc<ImageRecord>]) {
    tiles.truncate(records.len());
    for (index, record) in records.iter().enumerate() {
        match tiles.get_mut(index) {
            Some(tile) if Arc::ptr_eq(&tile.record, record) => {}
            Some(tile) => *tile = tile.update(Arc::clone(record)),
            None => tiles.push(Tile::new(Arc::clone(record))),
        }
    }
}

pub fn tab_bar(active: Tab) -> Element<'static, Message> {
    Tab::ALL
        .into_iter()
        .fold(Row::new().spacing(6), |bar, tab| {
            let style = if tab == active {
                button::primary
            } else {
                button::secondary
            };
            bar.push(
                button(text(tab.label()))
                    .style(style)
                    .padding([6, 16])
                    .on_press(Message::TabSelected(tab)),
            )
        })
        .into()
}

/// Four-column grid of the active artifact
pub fn gallery(tiles: &[Tile], tab: Tab, selected: Option<usize>) -> Element<'_, Message> {
    if tiles.is_empty() {
        return container(text("Import images to get started").size(16))
            .center_x(Length::Fill)
            .padding(40)
            .into();
    }

    let rows = tiles.chunks(GALLERY_COLUMNS).map(|chunk| {
        let mut line = Row::new().spacing(10);
        for tile in chunk {
            line = line.push(cell(tile, tab, selected == Some(tile.record.index)));
        }
        for _ in chunk.len()..GALLERY_COLUMNS {
            line = line.push(Space::with_width(Length::Fill));
        }
        Element::from(line)
    });

    column(rows).spacing(10).into()
}

fn cell(tile: &Tile, tab: Tab, selected: bool) -> Element<'_, Message> {
    let preview: Element<Message> = match tile.artifact(tab) {
        Some(handle) => image(handle.clone())
            .width(Length::Fill)
            .height(TILE_HEIGHT)
            .into(),
        None => container(text(tab.placeholder(&tile.record)).size(14))
            .center_x(Length::Fill)
            .center_y(TILE_HEIGHT)
            .into(),
    };

    let body = column![preview, text(&tile.record.name).size(12)]
        .spacing(4)
        .align_x(Alignment::Center);

    button(body)
        .style(if selected { button::primary } else { button::text })
        .width(Length::Fill)
        .on_press(Message::Select(tile.record.index))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use herbarium::state::{EdgeResult, JobOutput, Library, RecordPatch, Thresholds};

    #[test]
    fn test_refresh_reuses_unchanged_tiles() {
        let library = Library::new();
        library.append(["a.jpg", "b.jpg"]);
        let mut tiles = Vec::new();
        refresh(&mut tiles, &library.snapshot());
        assert_eq!(tiles.len(), 2);

        let before = Arc::clone(&tiles[0].record);
        library
            .merge_at(1, RecordPatch::Source(DataUri::encode("image/jpeg", &[1, 2])))
            .unwrap();
        refresh(&mut tiles, &library.snapshot());

        assert!(Arc::ptr_eq(&tiles[0].record, &before));
        assert!(tiles[1].record.is_loaded());
        assert!(tiles[1].artifact(Tab::Image).is_some());
        assert!(tiles[1].artifact(Tab::Edge).is_none());
    }

    #[test]
    fn test_refresh_keeps_undisturbed_handles() {
        let library = Library::new();
        library.append(["a.jpg"]);
        library
            .merge_at(0, RecordPatch::Source(DataUri::encode("image/jpeg", &[1, 2])))
            .unwrap();
        let mut tiles = Vec::new();
        refresh(&mut tiles, &library.snapshot());
        let source = tiles[0].artifact(Tab::Image).unwrap().id();

        library
            .merge_at(
                0,
                RecordPatch::Output(JobOutput::Edge(EdgeResult {
                    rendering: DataUri::png(&[3]),
                    thresholds: Thresholds::default(),
                })),
            )
            .unwrap();
        refresh(&mut tiles, &library.snapshot());

        assert_eq!(tiles[0].artifact(Tab::Image).unwrap().id(), source);
        assert!(tiles[0].artifact(Tab::Edge).is_some());
    }

    #[test]
    fn test_placeholders() {
        let record = ImageRecord::placeholder(0, "a.jpg");
        assert_eq!(Tab::Edge.placeholder(&record), "Loading...");
    }
}
