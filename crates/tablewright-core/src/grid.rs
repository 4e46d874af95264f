//! The cell grid: the engine's unit of output.

/// A structured table: header strings, data rows, and the boundary
/// positions that produced them.
///
/// Grids are immutable by convention: every transformation (combination,
/// post-processing) produces a new `CellGrid` rather than mutating one.
///
/// Serialized form (with the `serde` feature):
/// `{headers, rows, col_boundaries, row_boundaries, method, structure_method}`;
/// `footnotes` is omitted when empty.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellGrid {
    /// Header cells, left-to-right.
    pub headers: Vec<String>,
    /// Data rows, top-to-bottom; each row's cells left-to-right.
    pub rows: Vec<Vec<String>>,
    /// Internal column boundary positions used to build the grid.
    pub col_boundaries: Vec<f64>,
    /// Internal row boundary positions used to build the grid.
    pub row_boundaries: Vec<f64>,
    /// Name of the cell-extraction method that produced the grid.
    pub method: String,
    /// Name of the structure method that supplied the boundaries
    /// (`"consensus"` for the voted result).
    pub structure_method: String,
    /// Footnote text stripped from the table bottom, in removal order.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Vec::is_empty")
    )]
    pub footnotes: Vec<String>,
}

impl CellGrid {
    /// Number of columns (header row included in the count basis).
    pub fn column_count(&self) -> usize {
        self.headers
            .len()
            .max(self.rows.iter().map(|r| r.len()).max().unwrap_or(0))
    }

    /// Total number of cells across headers and rows.
    pub fn cell_count(&self) -> usize {
        self.headers.len() + self.rows.iter().map(|r| r.len()).sum::<usize>()
    }

    /// True when the grid has no headers and no rows.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Iterate over every cell (headers first, then rows in order).
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .map(String::as_str)
            .chain(self.rows.iter().flat_map(|r| r.iter().map(String::as_str)))
    }

    /// Fraction of cells that are non-blank; vacuously 1.0 for a grid with
    /// no cells.
    pub fn fill_rate(&self) -> f64 {
        let total = self.cell_count();
        if total == 0 {
            return 1.0;
        }
        let filled = self.cells().filter(|c| !c.trim().is_empty()).count();
        filled as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(headers: &[&str], rows: &[&[&str]]) -> CellGrid {
        CellGrid {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
            method: "words".into(),
            structure_method: "consensus".into(),
            ..CellGrid::default()
        }
    }

    #[test]
    fn test_fill_rate() {
        let g = grid(&["a", "b"], &[&["1", ""], &["", "2"]]);
        assert_eq!(g.fill_rate(), 4.0 / 6.0);
        assert_eq!(CellGrid::default().fill_rate(), 1.0);
    }

    #[test]
    fn test_column_count_uses_widest_row() {
        let g = grid(&["a"], &[&["1", "2", "3"]]);
        assert_eq!(g.column_count(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialized_form() {
        let g = grid(&["h"], &[&["v"]]);
        let json = serde_json::to_value(&g).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("headers"));
        assert!(obj.contains_key("rows"));
        assert!(obj.contains_key("col_boundaries"));
        assert!(obj.contains_key("row_boundaries"));
        assert!(obj.contains_key("method"));
        assert!(obj.contains_key("structure_method"));
        // footnotes omitted when empty
        assert!(!obj.contains_key("footnotes"));
    }
}
