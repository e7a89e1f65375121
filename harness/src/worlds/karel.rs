//! Karel grid world.
//!
//! A rectangular grid of cells. Each cell is either a wall or holds `0..=10`
//! markers. One agent stands on a non-wall cell facing a compass direction.
//!
//! Actions: `move`, `turnLeft`, `turnRight`, `pickMarker`, `putMarker`.
//! Perceptions: `frontIsClear`, `leftIsClear`, `rightIsClear`,
//! `markersPresent`, `noMarkersPresent`.
//!
//! Every action and perception charges the call budget; exceeding it crashes
//! the world. A `crashable` world also crashes on moving into a wall, picking
//! from an empty cell or putting onto a full one. With `leaps_behaviour`, a
//! blocked move turns the agent around instead.

use std::fmt;

use serde::{Deserialize, Serialize};

use gridsynth_kernel::env::{CallBudget, Environment, DEFAULT_MAX_CALLS};
use gridsynth_kernel::fingerprint::{canonical_hash, HashDomain};

/// Markers a single cell can hold.
pub const MAX_MARKERS_PER_CELL: u8 = 10;

/// Hex characters kept by [`KarelWorld::state_hash`].
pub const STATE_HASH_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    const CLOCKWISE: [Direction; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Clockwise index, north = 0.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`Direction::index`], modulo 4.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::CLOCKWISE[index % 4]
    }

    #[must_use]
    pub fn left(self) -> Self {
        Self::CLOCKWISE[(self.index() + 3) % 4]
    }

    #[must_use]
    pub fn right(self) -> Self {
        Self::CLOCKWISE[(self.index() + 1) % 4]
    }

    /// `(row, col)` offset of one step forward.
    #[must_use]
    pub fn delta(self) -> (isize, isize) {
        match self {
            Self::North => (-1, 0),
            Self::East => (0, 1),
            Self::South => (1, 0),
            Self::West => (0, -1),
        }
    }

    /// `(dx, dy)` as printed in state descriptions (x is the column).
    fn vector(self) -> (isize, isize) {
        let (dr, dc) = self.delta();
        (dc, dr)
    }

    fn glyph(self) -> char {
        match self {
            Self::North => '^',
            Self::East => '>',
            Self::South => 'v',
            Self::West => '<',
        }
    }

    fn from_glyph(c: char) -> Option<Self> {
        Some(match c {
            '^' => Self::North,
            '>' => Self::East,
            'v' => Self::South,
            '<' => Self::West,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

/// World dimensions and behaviour flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KarelConfig {
    pub rows: usize,
    pub cols: usize,
    pub crashable: bool,
    pub leaps_behaviour: bool,
    pub max_calls: u64,
}

impl Default for KarelConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            crashable: true,
            leaps_behaviour: false,
            max_calls: DEFAULT_MAX_CALLS,
        }
    }
}

/// Malformed ASCII map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KarelParseError {
    #[error("map is empty")]
    Empty,
    #[error("line {line} has {found} cells, expected {expected}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown cell '{glyph}' at ({row}, {col})")]
    UnknownCell { glyph: char, row: usize, col: usize },
    #[error("map has no agent")]
    NoAgent,
    #[error("map has a second agent at ({row}, {col})")]
    SecondAgent { row: usize, col: usize },
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KarelWorld {
    rows: usize,
    cols: usize,
    walls: Vec<bool>,
    markers: Vec<u8>,
    row: usize,
    col: usize,
    facing: Direction,
    crashed: bool,
    crashable: bool,
    leaps_behaviour: bool,
    budget: CallBudget,
}

impl KarelWorld {
    /// Open grid with the agent in the top-left corner facing north.
    #[must_use]
    pub fn new(config: &KarelConfig) -> Self {
        let cells = config.rows * config.cols;
        Self {
            rows: config.rows,
            cols: config.cols,
            walls: vec![false; cells],
            markers: vec![0; cells],
            row: 0,
            col: 0,
            facing: Direction::North,
            crashed: false,
            crashable: config.crashable,
            leaps_behaviour: config.leaps_behaviour,
            budget: CallBudget::new(config.max_calls),
        }
    }

    /// Parse an ASCII map: `*` wall, `.` or space empty, `1`-`9` markers,
    /// `M` ten markers, `^ > v <` the agent. `|` characters are ignored.
    /// Dimensions come from the map; flags and budget from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`KarelParseError`] for ragged, empty or agentless maps and
    /// unknown glyphs.
    pub fn parse(text: &str, config: &KarelConfig) -> Result<Self, KarelParseError> {
        let lines: Vec<Vec<char>> = text
            .lines()
            .map(|l| l.chars().filter(|&c| c != '|').collect::<Vec<_>>())
            .filter(|l| !l.is_empty())
            .collect();
        let cols = lines.first().map_or(0, Vec::len);
        if cols == 0 {
            return Err(KarelParseError::Empty);
        }
        let mut world = Self::new(&KarelConfig {
            rows: lines.len(),
            cols,
            ..config.clone()
        });
        let mut agent = None;
        for (r, line) in lines.iter().enumerate() {
            if line.len() != cols {
                return Err(KarelParseError::Ragged {
                    line: r,
                    expected: cols,
                    found: line.len(),
                });
            }
            for (c, &glyph) in line.iter().enumerate() {
                let i = world.cell(r, c);
                match glyph {
                    '*' => world.walls[i] = true,
                    '.' | ' ' => {}
                    '1'..='9' => world.markers[i] = glyph as u8 - b'0',
                    'M' => world.markers[i] = MAX_MARKERS_PER_CELL,
                    _ => {
                        let facing = Direction::from_glyph(glyph).ok_or(
                            KarelParseError::UnknownCell {
                                glyph,
                                row: r,
                                col: c,
                            },
                        )?;
                        if agent.is_some() {
                            return Err(KarelParseError::SecondAgent { row: r, col: c });
                        }
                        agent = Some((r, c, facing));
                    }
                }
            }
        }
        let (row, col, facing) = agent.ok_or(KarelParseError::NoAgent)?;
        world.place_agent(row, col, facing);
        Ok(world)
    }

    fn cell(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    fn offset(&self, row: usize, col: usize, (dr, dc): (isize, isize)) -> Option<(usize, usize)> {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        (r < self.rows && c < self.cols).then_some((r, c))
    }

    // --- layout ------------------------------------------------------------

    pub fn set_wall(&mut self, row: usize, col: usize) {
        let i = self.cell(row, col);
        self.walls[i] = true;
    }

    /// Wall off the outermost ring of cells.
    pub fn add_border(&mut self) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                if r == 0 || c == 0 || r + 1 == self.rows || c + 1 == self.cols {
                    self.set_wall(r, c);
                }
            }
        }
    }

    pub fn set_markers(&mut self, row: usize, col: usize, count: u8) {
        let i = self.cell(row, col);
        self.markers[i] = count.min(MAX_MARKERS_PER_CELL);
    }

    pub fn place_agent(&mut self, row: usize, col: usize, facing: Direction) {
        self.row = row;
        self.col = col;
        self.facing = facing;
    }

    // --- observation -------------------------------------------------------

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(row, col, facing)` of the agent.
    #[must_use]
    pub fn agent(&self) -> (usize, usize, Direction) {
        (self.row, self.col, self.facing)
    }

    #[must_use]
    pub fn is_wall(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.walls[self.cell(row, col)]
    }

    #[must_use]
    pub fn markers_at(&self, row: usize, col: usize) -> u8 {
        if row < self.rows && col < self.cols {
            self.markers[self.cell(row, col)]
        } else {
            0
        }
    }

    /// Marker counts in row-major order.
    #[must_use]
    pub fn marker_grid(&self) -> &[u8] {
        &self.markers
    }

    #[must_use]
    pub fn total_markers(&self) -> u32 {
        self.markers.iter().map(|&m| u32::from(m)).sum()
    }

    /// In bounds and not a wall.
    #[must_use]
    pub fn is_clear(&self, row: usize, col: usize, delta: (isize, isize)) -> bool {
        self.offset(row, col, delta)
            .is_some_and(|(r, c)| !self.walls[self.cell(r, c)])
    }

    #[must_use]
    pub fn front_is_clear(&self) -> bool {
        self.is_clear(self.row, self.col, self.facing.delta())
    }

    #[must_use]
    pub fn left_is_clear(&self) -> bool {
        self.is_clear(self.row, self.col, self.facing.left().delta())
    }

    #[must_use]
    pub fn right_is_clear(&self) -> bool {
        self.is_clear(self.row, self.col, self.facing.right().delta())
    }

    #[must_use]
    pub fn markers_present(&self) -> bool {
        self.markers_at(self.row, self.col) > 0
    }

    // --- actions -----------------------------------------------------------

    pub fn move_forward(&mut self) {
        let target = self.offset(self.row, self.col, self.facing.delta());
        let clear = self.front_is_clear();
        if !clear && self.crashable {
            self.crashed = true;
        }
        match target {
            Some((r, c)) if clear && !self.crashed => {
                self.row = r;
                self.col = c;
            }
            _ if self.leaps_behaviour => self.facing = self.facing.left().left(),
            _ => {}
        }
    }

    pub fn turn_left(&mut self) {
        self.facing = self.facing.left();
    }

    pub fn turn_right(&mut self) {
        self.facing = self.facing.right();
    }

    pub fn pick_marker(&mut self) {
        let i = self.cell(self.row, self.col);
        if self.markers[i] == 0 {
            self.crashed |= self.crashable;
        } else {
            self.markers[i] -= 1;
        }
    }

    pub fn put_marker(&mut self) {
        let i = self.cell(self.row, self.col);
        if self.markers[i] == MAX_MARKERS_PER_CELL {
            self.crashed |= self.crashable;
        } else {
            self.markers[i] += 1;
        }
    }

    // --- rendering ---------------------------------------------------------

    fn describe_cell(&self, r: usize, c: usize) -> String {
        let markers = self.markers_at(r, c);
        if self.is_wall(r, c) {
            format!("Wall({r}, {c}) ;")
        } else if (r, c) == (self.row, self.col) {
            let (dx, dy) = self.facing.vector();
            let agent = format!("Agent({r}, {c}, direction=({dx}, {dy}))");
            if markers > 0 {
                format!("{agent} and Marker({r}, {c}, quantity={markers}) ;")
            } else {
                format!("{agent} ;")
            }
        } else if markers > 0 {
            format!("Marker({r}, {c}, quantity={markers}) ;")
        } else {
            format!("Empty({r}, {c}) ;")
        }
    }

    fn describe_rows(&self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> String {
        let mut out = String::new();
        for r in rows {
            for c in cols.clone() {
                out.push_str(&self.describe_cell(r, c));
                if c + 1 < self.cols {
                    out.push('\t');
                }
            }
            if r + 1 != self.rows {
                out.push('\n');
            }
        }
        out
    }

    /// Every cell, one line per row, prefixed by `CRASHED` after a crash.
    #[must_use]
    pub fn full_state(&self) -> String {
        let body = self.describe_rows(0..self.rows, 0..self.cols);
        if self.crashed {
            format!("CRASHED\n{body}")
        } else {
            body
        }
    }

    /// The in-bounds 3x3 neighborhood of the agent.
    #[must_use]
    pub fn neighborhood(&self) -> String {
        let rows = self.row.saturating_sub(1)..(self.row + 2).min(self.rows);
        let cols = self.col.saturating_sub(1)..(self.col + 2).min(self.cols);
        self.describe_rows(rows, cols)
    }

    /// First [`STATE_HASH_LEN`] hex characters of the hash of the agent pose
    /// and marker grid. Walls, flags and budget are not part of the hash.
    #[must_use]
    pub fn state_hash(&self) -> String {
        let mut bytes = Vec::with_capacity(self.markers.len() + 24);
        for value in [self.row, self.col, self.facing.index()] {
            bytes.extend_from_slice(&(value as u64).to_le_bytes());
        }
        bytes.extend_from_slice(&self.markers);
        canonical_hash(HashDomain::EnvironmentState, &bytes)
            .short(STATE_HASH_LEN)
            .to_string()
    }

    fn charge(&mut self) -> bool {
        if self.budget.charge() {
            self.crashed = true;
        }
        self.crashed
    }
}

impl Environment for KarelWorld {
    fn perform(&mut self, action: &str) {
        if self.charge() {
            return;
        }
        match action {
            "move" => self.move_forward(),
            "turnLeft" => self.turn_left(),
            "turnRight" => self.turn_right(),
            "pickMarker" => self.pick_marker(),
            "putMarker" => self.put_marker(),
            _ => self.crashed = true,
        }
    }

    fn perceive(&mut self, perception: &str, _params: &[String]) -> bool {
        if self.charge() {
            return false;
        }
        match perception {
            "frontIsClear" => self.front_is_clear(),
            "leftIsClear" => self.left_is_clear(),
            "rightIsClear" => self.right_is_clear(),
            "markersPresent" => self.markers_present(),
            "noMarkersPresent" => !self.markers_present(),
            _ => false,
        }
    }

    fn is_crashed(&self) -> bool {
        self.crashed
    }

    fn calls(&self) -> u64 {
        self.budget.used()
    }

    fn partial_state(&self) -> String {
        self.neighborhood()
    }
}

/// The ASCII map format accepted by [`KarelWorld::parse`].
impl fmt::Display for KarelWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            if r > 0 {
                writeln!(f)?;
            }
            for c in 0..self.cols {
                let glyph = if (r, c) == (self.row, self.col) {
                    self.facing.glyph()
                } else if self.is_wall(r, c) {
                    '*'
                } else {
                    match self.markers_at(r, c) {
                        0 => '.',
                        MAX_MARKERS_PER_CELL => 'M',
                        n => char::from(b'0' + n),
                    }
                };
                write!(f, "{glyph}")?;
            }
        }
        Ok(())
    }
}
