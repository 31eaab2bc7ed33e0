use crate::config::OutputFormat;
use crate::error::Result;
use serde::Serialize;
use std::fmt::Write as _;
use user_cf::PredictionMode;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborEntry {
    pub index: usize,
    pub user_id: i64,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item_index: usize,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeRecommendations {
    pub mode: PredictionMode,
    pub predictable_items: usize,
    pub items: Vec<RankedItem>,
}

/// Everything one batch run produced for its target user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationReport {
    pub target_user_id: i64,
    pub target_index: usize,
    pub target_average: f64,
    pub user_count: usize,
    pub item_count: usize,
    /// Target's similarity row; `null` where the pair has no defined similarity
    pub similarities: Vec<Option<f64>>,
    pub neighbors: Vec<NeighborEntry>,
    pub recommendations: Vec<ModeRecommendations>,
}

impl RecommendationReport {
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();

        let similarities = self
            .similarities
            .iter()
            .enumerate()
            .map(|(i, s)| match s {
                _ if i == self.target_index => "self".to_string(),
                Some(value) => format!("{:.4}", value),
                None => "n/a".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        // Writing into a String cannot fail
        let _ = writeln!(
            out,
            "User {} (index {}, mean rating {:.3})",
            self.target_user_id, self.target_index, self.target_average
        );
        let _ = writeln!(out, "Similarities: [{}]", similarities);

        let _ = writeln!(out, "Top neighbors:");
        for neighbor in &self.neighbors {
            let _ = writeln!(
                out,
                "  user {} (index {}): {:.4}",
                neighbor.user_id, neighbor.index, neighbor.similarity
            );
        }

        for rec in &self.recommendations {
            let _ = writeln!(
                out,
                "Top items ({}, {} of {} predictable):",
                rec.mode,
                rec.items.len(),
                rec.predictable_items
            );
            for (rank, item) in rec.items.iter().enumerate() {
                let _ = writeln!(out, "  {}. {} ({:.3})", rank + 1, item.name, item.score);
            }
        }

        out
    }
}
