use iced::widget::{button, column, container, horizontal_space, row, scrollable, text};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use tokio_stream::wrappers::WatchStream;
use tracing_subscriber::EnvFilter;

use herbarium::compute::LeafUnit;
use herbarium::error::EditError;
use herbarium::import::metadata::ExifExtractor;
use herbarium::jobs::JobChannel;
use herbarium::state::Records;
use herbarium::{EditOutcome, OrchestratorHandle, Settings};

mod ui;

use ui::detail::{Draft, Field};
use ui::{Tab, Tile};

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif"];

/// Main application state
struct Herbarium {
    handle: OrchestratorHandle,
    settings: Settings,
    /// Decoded handles per record, in store order
    tiles: Vec<Tile>,
    pending: usize,
    tab: Tab,
    selected: Option<usize>,
    draft: Draft,
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    RecordsChanged(Records),
    PendingChanged(usize),
    ImportFiles,
    ImportFolder,
    TabSelected(Tab),
    Select(usize),
    FieldChanged(Field, String),
    Apply,
    EditFinished(usize, Result<EditOutcome, EditError>),
}

impl Herbarium {
    fn new(handle: OrchestratorHandle, settings: Settings) -> (Self, Task<Message>) {
        let watch_records = Task::run(WatchStream::new(handle.records()), Message::RecordsChanged);
        let watch_pending = Task::run(WatchStream::new(handle.pending()), Message::PendingChanged);

        (
            Herbarium {
                handle,
                settings,
                tiles: Vec::new(),
                pending: 0,
                tab: Tab::default(),
                selected: None,
                draft: Draft::default(),
                status: "Ready.".to_string(),
            },
            Task::batch([watch_records, watch_pending]),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::RecordsChanged(records) => {
                ui::refresh(&mut self.tiles, &records);
                Task::none()
            }
            Message::PendingChanged(count) => {
                if self.pending > 0 && count == 0 {
                    self.status = format!("Done. {} images in library.", self.tiles.len());
                }
                self.pending = count;
                Task::none()
            }
            Message::ImportFiles => {
                let files = FileDialog::new()
                    .set_title("Select Images")
                    .add_filter("Images", &IMAGE_EXTENSIONS)
                    .pick_files();

                if let Some(paths) = files {
                    self.status = format!("Importing {} files...", paths.len());
                    self.handle.import(paths);
                }
                Task::none()
            }
            Message::ImportFolder => {
                let folder = FileDialog::new()
                    .set_title("Select Folder with Images")
                    .pick_folder();

                if let Some(folder) = folder {
                    self.status = format!("Importing from {}...", folder.display());
                    self.handle.import_folder(folder);
                }
                Task::none()
            }
            Message::TabSelected(tab) => {
                self.tab = tab;
                if let Some(draft) = self.selected.and_then(|index| self.fresh_draft(index)) {
                    self.draft = draft;
                }
                Task::none()
            }
            Message::Select(index) => {
                self.selected = Some(index);
                self.draft = self.fresh_draft(index).unwrap_or_default();
                Task::none()
            }
            Message::FieldChanged(field, value) => {
                self.draft.set(field, value);
                Task::none()
            }
            Message::Apply => {
                let Some(index) = self.selected else {
                    return Task::none();
                };
                // Rejected drafts never reach the orchestrator
                let edit = match self.draft.edit(self.tab, &self.settings) {
                    Ok(edit) => edit,
                    Err(problem) => {
                        self.draft.rejected = Some(problem);
                        return Task::none();
                    }
                };

                let handle = self.handle.clone();
                Task::perform(async move { handle.edit(index, edit).await }, move |result| {
                    Message::EditFinished(index, result)
                })
            }
            Message::EditFinished(index, result) => {
                match result {
                    Ok(EditOutcome::Dispatched) => self.status = format!("Rendering image {}...", index + 1),
                    Ok(EditOutcome::Unchanged) => self.status = "Nothing changed.".to_string(),
                    Err(err) => {
                        tracing::info!(index, error = %err, "edit rejected");
                        if self.selected == Some(index) {
                            self.draft.rejected = Some(err.to_string());
                        }
                    }
                }
                Task::none()
            }
        }
    }

    fn fresh_draft(&self, index: usize) -> Option<Draft> {
        self.tiles
            .get(index)
            .map(|tile| Draft::for_record(&tile.record, &self.settings))
    }

    fn view(&self) -> Element<Message> {
        let busy = if self.pending > 0 {
            text(format!("⏳ {} jobs running", self.pending))
        } else {
            text("Idle")
        };

        let header = row![
            text("Herbarium").size(28),
            horizontal_space(),
            busy.size(14),
            button("Import Files").on_press(Message::ImportFiles).padding(10),
            button("Import Folder").on_press(Message::ImportFolder).padding(10),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let detail: Element<Message> = match self.selected.and_then(|index| self.tiles.get(index)) {
            Some(tile) => ui::detail::view(&tile.record, &self.draft, self.tab, &self.settings),
            None => text("Select an image").size(14).into(),
        };

        let body = row![
            scrollable(ui::gallery(&self.tiles, self.tab, self.selected))
                .width(Length::FillPortion(3))
                .height(Length::Fill),
            container(detail).width(Length::FillPortion(1)).padding(10),
        ]
        .spacing(20);

        column![header, ui::tab_bar(self.tab), body, text(&self.status).size(14)]
            .spacing(16)
            .padding(20)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

impl Drop for Herbarium {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("herbarium=info")),
        )
        .init();

    let settings = match Settings::load().and_then(|settings| settings.validate().map(|()| settings)) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "using default settings");
            Settings::default()
        }
    };

    // The orchestrator and the job channel live on their own runtime so the
    // UI executor only ever awaits handles.
    let runtime = tokio::runtime::Runtime::new().expect("Failed to start the tokio runtime");
    let _guard = runtime.enter();

    let channel = JobChannel::start(LeafUnit::new(settings.qr_size), settings.channel_options());
    let (handle, _task) = herbarium::spawn(channel, ExifExtractor, settings.clone())
        .expect("Fresh job channel already had a result handler");

    tracing::info!("🎨 Herbarium initialized");

    iced::application("Herbarium", Herbarium::update, Herbarium::view)
        .theme(Herbarium::theme)
        .centered()
        .run_with(move || Herbarium::new(handle, settings))
}
