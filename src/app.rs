use std::path::PathBuf;
use tui_choropleth::classify::{value_bounds, RegionValue};
use tui_choropleth::config::AppConfig;
use tui_choropleth::data::{load_basemap, BoundarySource, LoadEvent, Loader};
use tui_choropleth::map::{LayerState, MapController, PaintStyle, Viewport};
use tui_choropleth::slider::{ChangeEvent, ChangeKind, RangeSlider};

/// Rows taken by chrome around the map: two border rows, legend, status bar
const CHROME_ROWS: usize = 4;

/// Message shown in the status bar
#[derive(Clone, Debug, Default)]
pub struct Status {
    pub message: String,
    pub is_error: bool,
}

/// Application state
pub struct App {
    pub controller: MapController,
    pub loader: Loader,
    pub config: AppConfig,
    pub country_idx: usize,
    pub data_path: Option<PathBuf>,
    pub rows: Option<Vec<RegionValue>>,
    pub slider: Option<RangeSlider>,
    /// Ranges supplied up front; used until a slider exists
    pub fixed_event: Option<ChangeEvent>,
    pub last_event: Option<ChangeEvent>,
    /// Selected slider segment; thumbs share the index of the segment below them
    pub selected: usize,
    pub status: Status,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
}

/// Terminal cell to braille pixel, accounting for the 1-cell border
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(1) as i32) * 4;
    (px, py)
}

impl App {
    pub fn new(config: AppConfig, fixed_event: Option<ChangeEvent>, width: usize, height: usize) -> std::io::Result<Self> {
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(CHROME_ROWS);

        let basemap = load_basemap(&config.basemap.files, &config.basemap.attribution);
        let controller = MapController::new(
            Viewport::world(inner_width * 2, inner_height * 4),
            PaintStyle::from_config(&config.style),
            basemap,
        );
        let loader = Loader::new(BoundarySource::parse(&config.boundaries.source))?;

        let fixed_event = fixed_event.or_else(|| {
            (!config.slider.ranges.is_empty()).then(|| ChangeEvent {
                kind: ChangeKind::ThumbsReset,
                thumb_count: config.slider.ranges.len().saturating_sub(1),
                values: config.slider.ranges.iter().skip(1).map(|r| r.min).collect(),
                colors: config.slider.ranges.iter().map(|r| r.color.clone()).collect(),
                ranges: config.slider.ranges.clone(),
                moved_index: None,
            })
        });

        Ok(Self {
            controller,
            loader,
            data_path: config.data.path.clone(),
            config,
            country_idx: 0,
            rows: None,
            slider: None,
            last_event: fixed_event.clone(),
            fixed_event,
            selected: 0,
            status: Status::default(),
            should_quit: false,
            last_mouse: None,
            dragged: false,
        })
    }

    /// Kick off the initial boundary and table loads
    pub fn start(&mut self) {
        self.request_country();
        self.reload_data();
    }

    pub fn country(&self) -> Option<&str> {
        self.config.boundaries.countries.get(self.country_idx).map(String::as_str)
    }

    fn request_country(&mut self) {
        if let Some(country) = self.country().map(str::to_string) {
            self.loader.request_boundary(&country);
            self.info(format!("Loading {country}…"));
        }
    }

    /// Switch to the next/previous configured country
    pub fn cycle_country(&mut self, delta: i32) {
        let n = self.config.boundaries.countries.len();
        if n == 0 {
            return;
        }
        self.country_idx = (self.country_idx as i64 + delta as i64).rem_euclid(n as i64) as usize;
        self.request_country();
    }

    pub fn reload_data(&mut self) {
        if let Some(path) = self.data_path.clone() {
            self.loader.request_table(&path, &self.config.data);
        }
    }

    /// Apply finished loads; called once per frame
    pub fn tick(&mut self) {
        for event in self.loader.poll() {
            self.handle_load(event);
        }
    }

    pub fn handle_load(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Boundary { country, result, .. } => match result {
                Ok(collection) => {
                    let regions = collection.regions.len();
                    self.controller.load_boundaries(collection);
                    self.repaint();
                    self.info(format!("{country}: {regions} regions"));
                }
                Err(e) => {
                    tracing::warn!(%country, error = %e, "boundary load failed");
                    self.error(e.to_string());
                }
            },
            LoadEvent::Table { path, result, .. } => match result {
                Ok(rows) => self.set_rows(rows, &path),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "table load failed");
                    self.error(e.to_string());
                }
            },
        }
    }

    fn set_rows(&mut self, rows: Vec<RegionValue>, path: &std::path::Path) {
        match value_bounds(&rows) {
            Ok(bounds) => {
                let slider = RangeSlider::new(
                    bounds,
                    self.config.slider.thumbs,
                    self.config.slider.step,
                    self.config.slider.palette.clone(),
                );
                if self.fixed_event.is_none() {
                    self.last_event = Some(slider.event(ChangeKind::ThumbsReset, None));
                }
                self.slider = Some(slider);
                self.selected = 0;
                self.info(format!("{}: {} rows", path.display(), rows.len()));
            }
            Err(e) => {
                self.error(e.to_string());
                self.slider = None;
                if self.fixed_event.is_none() {
                    // No extent to slide over; every region falls back to the default color
                    self.last_event = None;
                    let unranged = ChangeEvent {
                        kind: ChangeKind::ThumbsReset,
                        thumb_count: 0,
                        values: Vec::new(),
                        colors: Vec::new(),
                        ranges: Vec::new(),
                        moved_index: None,
                    };
                    self.controller.paint(&unranged, &rows);
                }
            }
        }
        self.rows = Some(rows);
        self.repaint();
    }

    /// Route a slider change to the map
    pub fn apply(&mut self, event: ChangeEvent) {
        self.fixed_event = None;
        self.last_event = Some(event);
        self.repaint();
    }

    fn repaint(&mut self) {
        if let (Some(event), Some(rows)) = (&self.last_event, &self.rows) {
            self.controller.paint(event, rows);
        }
    }

    pub fn select_segment(&mut self, delta: i32) {
        let Some(slider) = &self.slider else { return };
        let segments = slider.thumb_count() as i64 + 1;
        self.selected = (self.selected as i64 + delta as i64).rem_euclid(segments) as usize;
    }

    /// Move the thumb at the top of the selected segment
    pub fn move_thumb(&mut self, steps: i32) {
        let selected = self.selected;
        if let Some(event) = self.slider.as_mut().and_then(|s| s.move_thumb(selected, steps)) {
            self.apply(event);
        }
    }

    pub fn cycle_color(&mut self) {
        let selected = self.selected;
        if let Some(event) = self.slider.as_mut().and_then(|s| s.cycle_color(selected)) {
            self.apply(event);
        }
    }

    pub fn reset_thumbs(&mut self) {
        if let Some(event) = self.slider.as_mut().map(RangeSlider::reset) {
            self.apply(event);
        }
    }

    pub fn change_thumb_count(&mut self, delta: i32) {
        let Some(slider) = self.slider.as_mut() else { return };
        let count = (slider.thumb_count() as i64 + delta as i64).clamp(1, 9) as usize;
        if count == slider.thumb_count() {
            return;
        }
        let event = slider.set_thumb_count(count);
        self.selected = self.selected.min(count);
        self.apply(event);
    }

    fn info(&mut self, message: String) {
        self.status = Status {
            message,
            is_error: false,
        };
    }

    fn error(&mut self, message: String) {
        self.status = Status {
            message,
            is_error: true,
        };
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(CHROME_ROWS);
        self.controller.viewport.width = inner_width * 2;
        self.controller.viewport.height = inner_height * 4;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.controller.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.controller.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.controller.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        self.controller.viewport.zoom_out_at(px, py);
    }

    pub fn fit(&mut self) {
        self.controller.fit();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn begin_press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Handle mouse drag: pan by the distance moved
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
            }
            // Braille cells are 2x4 pixels
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Mouse release: a press without drag is a click on the map
    pub fn end_press(&mut self, col: u16, row: u16) {
        if self.last_mouse.is_some() && !self.dragged {
            let (px, py) = cell_to_pixel(col, row);
            self.controller.click(px, py);
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.controller.viewport.zoom)
    }

    pub fn state_label(&self) -> &'static str {
        match self.controller.state() {
            LayerState::Empty => "empty",
            LayerState::Loaded => "loaded",
            LayerState::Painted => "painted",
        }
    }
}
