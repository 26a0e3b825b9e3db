use crate::classify::{Range, ValueBounds};
use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};

/// What the slider did to produce an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    ThumbMoved,
    ThumbsReset,
    ColorChanged,
}

/// Snapshot of the range slider after a change
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub thumb_count: usize,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
    pub ranges: Vec<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_index: Option<usize>,
}

impl ChangeEvent {
    /// Parse an event produced by an external slider; every range is validated
    pub fn from_json(s: &str) -> Result<Self> {
        let event: ChangeEvent = serde_json::from_str(s).map_err(|e| MapError::Decode {
            what: "change event",
            reason: e.to_string(),
        })?;
        for range in &event.ranges {
            range.validate()?;
        }
        Ok(event)
    }
}

/// Multi-thumb slider over a value extent.
///
/// `n` thumbs split `[min, max]` into `n + 1` segments, each with its own
/// color. Segment `i` covers `[b_i, b_{i+1}]` over boundaries
/// `[min, thumbs.., max]`; shared endpoints go to the lower segment because
/// classification is first-match.
#[derive(Clone, Debug)]
pub struct RangeSlider {
    bounds: ValueBounds,
    values: Vec<f64>,
    colors: Vec<String>,
    palette: Vec<String>,
    step: f64,
}

impl RangeSlider {
    pub fn new(bounds: ValueBounds, thumb_count: usize, step: f64, palette: Vec<String>) -> Self {
        let mut slider = Self {
            bounds,
            values: Vec::new(),
            colors: Vec::new(),
            palette,
            step: if step > 0.0 { step } else { 1.0 },
        };
        slider.spread(thumb_count.max(1));
        slider
    }

    pub fn thumb_count(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    /// Evenly space thumbs and assign palette colors to segments
    fn spread(&mut self, thumb_count: usize) {
        let span = self.bounds.max - self.bounds.min;
        let segments = thumb_count + 1;
        self.values = (1..=thumb_count)
            .map(|i| self.snap(self.bounds.min + span * i as f64 / segments as f64))
            .collect();
        self.colors = (0..segments).map(|i| self.palette_color(i, segments)).collect();
    }

    /// Sample the palette so any segment count spans it end to end
    fn palette_color(&self, segment: usize, segments: usize) -> String {
        if self.palette.is_empty() {
            return crate::classify::DEFAULT_COLOR.to_string();
        }
        let idx = if segments <= 1 {
            0
        } else {
            (segment * (self.palette.len() - 1) + (segments - 1) / 2) / (segments - 1)
        };
        self.palette[idx.min(self.palette.len() - 1)].clone()
    }

    fn snap(&self, v: f64) -> f64 {
        let snapped = self.bounds.min + ((v - self.bounds.min) / self.step).round() * self.step;
        snapped.clamp(self.bounds.min, self.bounds.max)
    }

    /// Ranges derived from the current thumbs
    pub fn ranges(&self) -> Vec<Range> {
        let mut edges = Vec::with_capacity(self.values.len() + 2);
        edges.push(self.bounds.min);
        edges.extend_from_slice(&self.values);
        edges.push(self.bounds.max);

        edges
            .windows(2)
            .zip(&self.colors)
            .map(|(w, color)| Range {
                min: w[0],
                max: w[1],
                color: color.clone(),
            })
            .collect()
    }

    /// Current state as an event of the given kind
    pub fn event(&self, kind: ChangeKind, moved_index: Option<usize>) -> ChangeEvent {
        ChangeEvent {
            kind,
            thumb_count: self.values.len(),
            values: self.values.clone(),
            colors: self.colors.clone(),
            ranges: self.ranges(),
            moved_index,
        }
    }

    /// Move a thumb by whole steps, clamped between its neighbours
    pub fn move_thumb(&mut self, index: usize, steps: i32) -> Option<ChangeEvent> {
        let current = *self.values.get(index)?;
        let lower = if index == 0 { self.bounds.min } else { self.values[index - 1] };
        let upper = self.values.get(index + 1).copied().unwrap_or(self.bounds.max);

        let moved = self.snap(current + steps as f64 * self.step).clamp(lower, upper);
        if moved == current {
            return None;
        }
        self.values[index] = moved;
        Some(self.event(ChangeKind::ThumbMoved, Some(index)))
    }

    pub fn reset(&mut self) -> ChangeEvent {
        self.spread(self.values.len());
        self.event(ChangeKind::ThumbsReset, None)
    }

    pub fn set_thumb_count(&mut self, thumb_count: usize) -> ChangeEvent {
        self.spread(thumb_count.max(1));
        self.event(ChangeKind::ThumbsReset, None)
    }

    pub fn set_color(&mut self, segment: usize, color: impl Into<String>) -> Option<ChangeEvent> {
        let slot = self.colors.get_mut(segment)?;
        *slot = color.into();
        Some(self.event(ChangeKind::ColorChanged, None))
    }

    /// Advance a segment to the next palette color
    pub fn cycle_color(&mut self, segment: usize) -> Option<ChangeEvent> {
        let current = self.colors.get(segment)?;
        let next = self
            .palette
            .iter()
            .position(|c| c == current)
            .map(|i| (i + 1) % self.palette.len())
            .and_then(|i| self.palette.get(i))
            .or_else(|| self.palette.first())?
            .clone();
        self.set_color(segment, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn palette() -> Vec<String> {
        ["#ffffb2", "#fecc5c", "#fd8d3c", "#f03b20", "#bd0026"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn slider() -> RangeSlider {
        RangeSlider::new(ValueBounds { min: 0.0, max: 100.0 }, 3, 1.0, palette())
    }

    #[test]
    fn test_even_spread() {
        let s = slider();
        assert_eq!(s.values(), &[25.0, 50.0, 75.0]);
        assert_eq!(s.colors().len(), 4);
        assert_eq!(s.colors()[0], "#ffffb2");
        assert_eq!(s.colors()[3], "#bd0026");
    }

    #[test]
    fn test_ranges_cover_extent() {
        let ranges = slider().ranges();
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[0].min, 0.0);
        assert_eq!(ranges[0].max, 25.0);
        assert_eq!(ranges[3].max, 100.0);
        // Shared edge goes to the lower segment
        assert_eq!(classify(Some(25.0), Some(&ranges)), ranges[0].color);
    }

    #[test]
    fn test_move_thumb_emits_event() {
        let mut s = slider();
        let event = s.move_thumb(1, 5).unwrap();
        assert_eq!(event.kind, ChangeKind::ThumbMoved);
        assert_eq!(event.moved_index, Some(1));
        assert_eq!(event.values, vec![25.0, 55.0, 75.0]);
        assert_eq!(event.ranges[1].max, 55.0);
    }

    #[test]
    fn test_move_thumb_clamped_by_neighbours() {
        let mut s = slider();
        let event = s.move_thumb(1, 100).unwrap();
        assert_eq!(event.values[1], 75.0);
        assert!(s.move_thumb(1, 1).is_none());
        assert!(s.move_thumb(9, 1).is_none());
    }

    #[test]
    fn test_reset_restores_spacing() {
        let mut s = slider();
        s.move_thumb(0, -10);
        let event = s.reset();
        assert_eq!(event.kind, ChangeKind::ThumbsReset);
        assert_eq!(event.values, vec![25.0, 50.0, 75.0]);
        assert_eq!(event.moved_index, None);
    }

    #[test]
    fn test_cycle_color() {
        let mut s = slider();
        let event = s.cycle_color(0).unwrap();
        assert_eq!(event.kind, ChangeKind::ColorChanged);
        assert_eq!(event.colors[0], "#fecc5c");
        assert_eq!(event.ranges[0].color, "#fecc5c");
    }

    #[test]
    fn test_event_json_shape() {
        let json = r##"{
            "type": "thumbMoved",
            "thumbCount": 1,
            "values": [10],
            "colors": ["red", "blue"],
            "ranges": [{"min": 0, "max": 10, "color": "red"}, {"min": 11, "max": 20, "color": "blue"}],
            "movedIndex": 0
        }"##;
        let event = ChangeEvent::from_json(json).unwrap();
        assert_eq!(event.kind, ChangeKind::ThumbMoved);
        assert_eq!(event.moved_index, Some(0));
        assert_eq!(classify(Some(15.0), Some(&event.ranges)), "blue");
    }

    #[test]
    fn test_event_json_rejects_bad_range() {
        let json = r#"{"type":"thumbsReset","thumbCount":0,"values":[],"colors":[],
            "ranges":[{"min":5,"max":1,"color":"red"}]}"#;
        assert!(ChangeEvent::from_json(json).is_err());
    }
}
