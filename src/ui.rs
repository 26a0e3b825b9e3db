use crate::app::App;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};
use tui_choropleth::braille::{BrailleCanvas, BLANK};
use tui_choropleth::color::Rgb;
use tui_choropleth::map::{format_value, MapLayers};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Legend
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_legend(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = app.country().map(|c| format!(" {c} ")).unwrap_or_else(|| " Map ".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layers = app.controller.render(inner.width as usize, inner.height as usize);

    // Popup anchor in cell coordinates
    let marker = app.controller.popup().and_then(|popup| {
        let (px, py) = app.controller.viewport.project(popup.lon, popup.lat);
        if px < 0 || py < 0 {
            return None;
        }
        let (cx, cy) = ((px / 2) as u16, (py / 4) as u16);
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, marker }, inner);

    if let (Some(popup), Some((cx, cy))) = (app.controller.popup(), marker) {
        render_popup(frame, &popup.content(), inner, cx, cy);
    }
}

/// Boxed label placed beside the marker, kept inside the map area
fn render_popup(frame: &mut Frame, content: &str, inner: Rect, cx: u16, cy: u16) {
    let width = (content.chars().count() as u16 + 4).min(inner.width);
    let height = 3.min(inner.height);
    if width < 3 || height < 3 {
        return;
    }

    let mut x = inner.x + cx + 1;
    if x + width > inner.x + inner.width {
        x = (inner.x + cx).saturating_sub(width).max(inner.x);
    }
    let mut y = (inner.y + cy).saturating_sub(height);
    if y < inner.y {
        y = (inner.y + cy + 1).min(inner.y + inner.height - height);
    }

    let rect = Rect::new(x, y, width, height);
    let popup = Paragraph::new(Span::styled(
        format!(" {content} "),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray)),
    );
    frame.render_widget(Clear, rect);
    frame.render_widget(popup, rect);
}

/// Renders cell fills with braille basemap and outlines on top
struct MapWidget {
    layers: MapLayers,
    marker: Option<(u16, u16)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        let rows = canvas.height().min(area.height as usize);
        let cols = canvas.width().min(area.width as usize);
        for cy in 0..rows {
            for cx in 0..cols {
                let ch = canvas.cell(cx, cy);
                if ch == BLANK {
                    continue;
                }
                let (x, y) = (area.x + cx as u16, area.y + cy as u16);
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = self.layers.height.min(area.height as usize);
        let cols = self.layers.width.min(area.width as usize);

        // 1. Region fills as cell backgrounds
        for cy in 0..rows {
            for cx in 0..cols {
                if let Some(fill) = self.layers.fill(cx, cy) {
                    buf[(area.x + cx as u16, area.y + cy as u16)].set_bg(fill.into());
                }
            }
        }

        // 2. Basemap lines
        self.render_layer(&self.layers.basemap, Color::DarkGray, area, buf);

        // 3. Region outlines on top
        let outline: Color = self.layers.outline_color.into();
        self.render_layer(&self.layers.outlines, outline, area, buf);

        if let Some((cx, cy)) = self.marker {
            let (x, y) = (area.x + cx, area.y + cy);
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::Red);
            }
        }
    }
}

/// One swatch per range; the selected segment is underlined
fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let ranges = match (&app.slider, &app.last_event) {
        (Some(slider), _) => slider.ranges(),
        (None, Some(event)) => event.ranges.clone(),
        _ => Vec::new(),
    };

    let mut spans = vec![Span::styled(" Ranges: ", Style::default().fg(Color::DarkGray))];
    if ranges.is_empty() {
        spans.push(Span::styled("load a dataset (d)", Style::default().fg(Color::DarkGray)));
    }
    for (i, range) in ranges.iter().enumerate() {
        let swatch: Color = Rgb::parse(&range.color).unwrap_or(Rgb(0xcc, 0xcc, 0xcc)).into();
        let mut label = Style::default().fg(Color::Gray);
        if app.slider.is_some() && i == app.selected {
            label = label.fg(Color::White).add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(Span::styled("██", Style::default().fg(swatch)));
        spans.push(Span::styled(
            format!(" {}–{} ", format_value(range.min), format_value(range.max)),
            label,
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_style = if app.status.is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", Style::default().fg(Color::DarkGray)),
        Span::styled(app.state_label(), Style::default().fg(Color::Magenta)),
        Span::styled(") ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.status.message.as_str(), status_style),
        Span::styled(
            " | n/N:country tab:segment [/]:thumb c:color t/T:thumbs r:reset f:fit d:reload q:quit | © ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            app.controller.basemap().attribution.as_str(),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
