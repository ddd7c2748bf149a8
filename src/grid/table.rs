// src/grid/table.rs
/*!
Serialization contract: header metadata, ordered traversal, and a
self-describing text table that round-trips through `create`.

Table layout
------------
```text
#! FIELDS x y label der_x der_y
#! SET min_x 0
#! SET max_x 1
#! SET nbins_x 4
#! SET periodic_x false
#! SET min_y ...
   <x> <y> <value> [<der_x> <der_y>]
```
- Dense grids write every cell in flat-index order (axis 0 fastest) and, for
  `d > 1`, a blank line after each sweep of axis 0.
- Sparse grids write populated cells only.
- `der_*` columns are present iff the grid tracks derivatives.
*/

use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, Result};
use crate::space::axis::{AxisDescriptor, AxisSpec};
use crate::store::storage_trait::Storage;

use super::Grid;

// ===================================================================
// ------------------------ Header & Entries -------------------------
// ===================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    pub label: String,
    pub axes: Vec<AxisDescriptor>,
    pub has_derivatives: bool,
}

/// One populated cell with its grid-point coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub index: usize,
    pub point: Vec<f64>,
    pub value: f64,
    /// Empty when the grid has no derivatives.
    pub gradient: Vec<f64>,
}

impl<S: Storage> Grid<S> {
    pub fn header(&self) -> GridHeader {
        GridHeader {
            label: self.label.clone(),
            axes: self.axes().to_vec(),
            has_derivatives: self.use_deriv,
        }
    }

    /// Populated cells in ascending flat-index order (dense: every cell).
    pub fn entries(&self) -> Vec<GridEntry> {
        let mut idx = vec![0usize; self.dimension()];
        self.store
            .entries()
            .into_iter()
            .map(|c| {
                self.codec.decompose_into(c.index, &mut idx);
                GridEntry {
                    index: c.index,
                    point: self.codec.corner(&idx),
                    value: c.value,
                    gradient: c.gradient,
                }
            })
            .collect()
    }
}

// ===================================================================
// ----------------------------- Writing -----------------------------
// ===================================================================

impl<S: Storage> Grid<S> {
    /// Write the header lines of the text table.
    pub fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        let mut fields = self.arg_names();
        fields.push(self.label.clone());
        if self.use_deriv {
            fields.extend(self.axes().iter().map(|a| format!("der_{}", a.name)));
        }
        writeln!(out, "#! FIELDS {}", fields.join(" "))?;
        for a in self.axes() {
            writeln!(out, "#! SET min_{} {}", a.name, a.str_min)?;
            writeln!(out, "#! SET max_{} {}", a.name, a.str_max)?;
            writeln!(out, "#! SET nbins_{} {}", a.name, a.nbins)?;
            writeln!(out, "#! SET periodic_{} {}", a.name, a.periodic)?;
        }
        Ok(())
    }

    /// Write the full text table (header + rows).
    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        self.write_header(out)?;
        let sweep = self.npoints()[0];
        let blank_lines = S::MATERIALIZED && self.dimension() > 1;

        for e in self.entries() {
            let mut line = String::new();
            for x in &e.point {
                line.push_str(&format!(" {x:>24.15e}"));
            }
            line.push_str(&format!(" {:>24.15e}", e.value));
            for g in &e.gradient {
                line.push_str(&format!(" {g:>24.15e}"));
            }
            writeln!(out, "{line}")?;
            if blank_lines && e.index % sweep == sweep - 1 {
                writeln!(out)?;
            }
        }
        Ok(())
    }

    /// Dump header and populated entries as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct GridJson {
            header: GridHeader,
            entries: Vec<GridEntry>,
        }

        let json = serde_json::to_string_pretty(&GridJson { header: self.header(), entries: self.entries() })?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

// ===================================================================
// ----------------------------- Reading -----------------------------
// ===================================================================

struct ParsedTable {
    fields: Vec<String>,
    sets: Vec<(String, String)>,
    rows: Vec<(usize, Vec<f64>)>,
}

fn parse_table<R: BufRead>(reader: R) -> Result<ParsedTable> {
    let mut fields: Option<Vec<String>> = None;
    let mut sets = Vec::new();
    let mut rows = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("#!") {
            let mut tok = rest.split_whitespace();
            match tok.next() {
                Some("FIELDS") => fields = Some(tok.map(str::to_string).collect()),
                Some("SET") => {
                    let key = tok.next().ok_or_else(|| GridError::Parse(format!("line {}: SET without key", lineno + 1)))?;
                    let val = tok.next().ok_or_else(|| GridError::Parse(format!("line {}: SET {key} without value", lineno + 1)))?;
                    sets.push((key.to_string(), val.to_string()));
                }
                _ => {}
            }
            continue;
        }
        if trimmed.starts_with('#') {
            continue;
        }
        let row = trimmed
            .split_whitespace()
            .map(|t| t.parse::<f64>().map_err(|_| GridError::Parse(format!("line {}: bad number '{t}'", lineno + 1))))
            .collect::<Result<Vec<f64>>>()?;
        rows.push((lineno + 1, row));
    }

    let fields = fields.ok_or_else(|| GridError::Parse("missing '#! FIELDS' line".into()))?;
    Ok(ParsedTable { fields, sets, rows })
}

impl ParsedTable {
    fn set(&self, key: &str) -> Result<&str> {
        self.sets
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| GridError::Parse(format!("missing '#! SET {key}'")))
    }

    fn axis_spec(&self, name: &str) -> Result<AxisSpec> {
        let nbins = self
            .set(&format!("nbins_{name}"))?
            .parse::<usize>()
            .map_err(|_| GridError::Parse(format!("bad nbins for axis '{name}'")))?;
        let periodic = match self.set(&format!("periodic_{name}"))? {
            "true" => true,
            "false" => false,
            other => return Err(GridError::Parse(format!("bad periodic flag '{other}' for axis '{name}'"))),
        };
        Ok(AxisSpec::new(
            name,
            self.set(&format!("min_{name}"))?,
            self.set(&format!("max_{name}"))?,
            nbins,
            periodic,
        ))
    }
}

impl<S: Storage> Grid<S> {
    /// Rebuild a grid from a text table, taking the geometry from its header.
    pub fn read_table<R: BufRead>(label: &str, reader: R, use_spline: bool, use_deriv: bool) -> Result<Self> {
        Self::create(label, reader, None, use_spline, use_deriv)
    }

    /// Rebuild a grid from a text table.
    ///
    /// If `expected` is given, the table's axes must match it in order, name,
    /// bounds, bin count and periodicity, otherwise `SchemaMismatch`. Asking for
    /// derivatives from a table without `der_*` columns is also `SchemaMismatch`.
    pub fn create<R: BufRead>(
        label: &str,
        reader: R,
        expected: Option<&[AxisSpec]>,
        use_spline: bool,
        use_deriv: bool,
    ) -> Result<Self> {
        let table = parse_table(reader)?;
        let dim = table
            .fields
            .iter()
            .position(|f| f == label)
            .ok_or_else(|| GridError::SchemaMismatch(format!("no field named '{label}' in table")))?;
        if dim == 0 {
            return Err(GridError::Parse(format!("field '{label}' has no axis columns before it")));
        }
        let names = &table.fields[..dim];
        let der_fields: Vec<String> = names.iter().map(|n| format!("der_{n}")).collect();
        let has_der = table.fields.len() == 2 * dim + 1 && table.fields[dim + 1..] == der_fields[..];
        if use_deriv && !has_der {
            return Err(GridError::SchemaMismatch(format!(
                "derivatives requested but table has no {der_fields:?} columns"
            )));
        }

        let axes = names
            .iter()
            .map(|n| table.axis_spec(n)?.build())
            .collect::<Result<Vec<_>>>()?;

        if let Some(expected) = expected {
            if expected.len() != axes.len() {
                return Err(GridError::SchemaMismatch(format!(
                    "table has {} axes, expected {}",
                    axes.len(),
                    expected.len()
                )));
            }
            for (got, want) in axes.iter().zip(expected) {
                let want = want.build()?;
                if got.name != want.name || !got.same_geometry(&want) {
                    return Err(GridError::SchemaMismatch(format!(
                        "axis '{}' [{}, {}] nbins={} periodic={} does not match expected '{}' [{}, {}] nbins={} periodic={}",
                        got.name, got.str_min, got.str_max, got.nbins, got.periodic,
                        want.name, want.str_min, want.str_max, want.nbins, want.periodic
                    )));
                }
            }
        }

        let mut grid = Self::from_axes(label, axes, use_spline, use_deriv)?;
        let ncols = table.fields.len();
        for (lineno, row) in &table.rows {
            if row.len() < ncols {
                return Err(GridError::Parse(format!("line {lineno}: expected {ncols} columns, got {}", row.len())));
            }
            let idx = grid.codec.nearest_indices(&row[..dim])?;
            let k = grid.codec.compose(&idx);
            if use_deriv {
                grid.store.set_value_and_gradient(k, row[dim], &row[dim + 1..2 * dim + 1]);
            } else {
                grid.store.set_value(k, row[dim]);
            }
        }
        debug!(label, rows = table.rows.len(), populated = grid.populated(), "grid read from table");
        Ok(grid)
    }
}
