use std::f64::consts::TAU;

use spacetimedb::SpacetimeType;

use crate::roster::Participant;

/// Segment fill colors, cycled in roster order
pub const SEGMENT_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FFEAA7",
    "#DDA0DD", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E9",
];

/// Names longer than this are shortened on the wheel
const LABEL_MAX_CHARS: usize = 15;
const LABEL_KEEP_CHARS: usize = 12;

/// One wheel slice in wheel-local coordinates (radians, unrotated)
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct Segment {
    pub index: u32,
    pub label: String,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: String,
}

/// Shorten long names to fit a slice ("Bartholomew-Smithers" -> "Bartholomew-...")
pub fn segment_label(name: &str) -> String {
    if name.chars().count() > LABEL_MAX_CHARS {
        let head: String = name.chars().take(LABEL_KEEP_CHARS).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

pub fn segment_color(index: usize) -> &'static str {
    SEGMENT_PALETTE[index % SEGMENT_PALETTE.len()]
}

/// Equal-width slices in roster order; slice i spans [i * w, (i + 1) * w)
pub fn layout_segments(roster: &[Participant]) -> Vec<Segment> {
    if roster.is_empty() {
        return Vec::new();
    }
    let width = TAU / roster.len() as f64;
    roster
        .iter()
        .enumerate()
        .map(|(i, participant)| Segment {
            index: i as u32,
            label: segment_label(&participant.name),
            start_angle: i as f64 * width,
            end_angle: (i + 1) as f64 * width,
            color: segment_color(i).to_string(),
        })
        .collect()
}
