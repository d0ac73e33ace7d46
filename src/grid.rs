//! Grid layout calculation.
//!
//! [`compute_positions`] turns a window count and a screen size into a list
//! of non-overlapping [`Rect`]s, laid out row by row.  Small counts use a
//! fixed row shape (see [`build_rows`]); larger counts fill rows of three.
//!
//! Everything here is pure: no state, no I/O.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Margins around the usable area and the gap between neighbouring cells,
/// all in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutSpec {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub gap: u32,
}

impl LayoutSpec {
    /// The all-zero layout: windows cover the full screen edge to edge.
    pub const ZERO: LayoutSpec = LayoutSpec {
        top: 0,
        right: 0,
        bottom: 0,
        left: 0,
        gap: 0,
    };

    /// Build a layout with the same value for every margin and the gap.
    pub fn uniform(px: u32) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
            gap: px,
        }
    }
}

impl fmt::Display for LayoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{}",
            self.top, self.right, self.bottom, self.left, self.gap
        )
    }
}

/// A layout string did not contain exactly five non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutSpecError {
    #[error("invalid value in layout spec: {0:?}")]
    InvalidValue(String),
    #[error("layout spec must contain 5 integers: top,right,bottom,left,gap (got {0})")]
    WrongFieldCount(usize),
}

impl FromStr for LayoutSpec {
    type Err = LayoutSpecError;

    /// Parse `top,right,bottom,left,gap`.  A `:` is accepted wherever a `,`
    /// is.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split([',', ':']).collect();
        if fields.len() != 5 {
            return Err(LayoutSpecError::WrongFieldCount(fields.len()));
        }
        let mut values = [0u32; 5];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field
                .trim()
                .parse()
                .map_err(|_| LayoutSpecError::InvalidValue(field.to_string()))?;
        }
        let [top, right, bottom, left, gap] = values;
        Ok(Self {
            top,
            right,
            bottom,
            left,
            gap,
        })
    }
}

/// Accepts `{"top":8,"gap":4,...}` (missing keys are zero) or the string form
/// `"8,8,8,8,4"`.
impl<'de> Deserialize<'de> for LayoutSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = LayoutSpec;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "object {{top, right, bottom, left, gap}} or string \"t,r,b,l,g\"")
            }
            fn visit_map<A>(self, mut map: A) -> Result<LayoutSpec, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut spec = LayoutSpec::ZERO;
                while let Some(k) = map.next_key::<String>()? {
                    match k.as_str() {
                        "top" => spec.top = map.next_value()?,
                        "right" => spec.right = map.next_value()?,
                        "bottom" => spec.bottom = map.next_value()?,
                        "left" => spec.left = map.next_value()?,
                        "gap" => spec.gap = map.next_value()?,
                        _ => {
                            let _: serde::de::IgnoredAny = map.next_value()?;
                        }
                    }
                }
                Ok(spec)
            }
            fn visit_str<E>(self, s: &str) -> Result<LayoutSpec, E>
            where
                E: DeError,
            {
                s.parse().map_err(DeError::custom)
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Pixel geometry of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Split `total` into `slots` parts that sum to exactly `total`.
///
/// Each part gets `total / slots`; the first `total % slots` parts get one
/// extra pixel.  Zero slots yields an empty vector.
pub fn distribute(total: u32, slots: usize) -> Vec<u32> {
    if slots == 0 {
        return Vec::new();
    }
    // `slots` never realistically exceeds u32, but saturate rather than wrap.
    let n = u32::try_from(slots).unwrap_or(u32::MAX);
    let base = total / n;
    let remainder = (total % n) as usize;
    (0..slots)
        .map(|i| base + u32::from(i < remainder))
        .collect()
}

/// Column count of each row for `count` windows.
///
/// Up to six windows use a hand-picked shape; beyond that, rows of three are
/// filled greedily and the last row holds the remainder.
pub fn build_rows(count: usize) -> Vec<usize> {
    match count {
        0 => Vec::new(),
        1 => vec![1],
        2 => vec![2],
        3 => vec![3],
        4 => vec![2, 2],
        5 => vec![2, 3],
        6 => vec![3, 3],
        _ => {
            let mut rows = Vec::with_capacity(count.div_ceil(3));
            let mut remaining = count;
            while remaining > 0 {
                let cols = remaining.min(3);
                rows.push(cols);
                remaining -= cols;
            }
            rows
        }
    }
}

/// Lay out `count` windows on a `screen_width × screen_height` screen.
///
/// Rows are stacked top to bottom starting at `layout.top`; cells within a
/// row run left to right starting at `layout.left`.  Widths and heights are
/// split with [`distribute`], so any leftover pixels go to the first rows
/// and columns.
pub fn compute_positions(
    count: usize,
    screen_width: u32,
    screen_height: u32,
    layout: &LayoutSpec,
) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let rows = build_rows(count);
    let row_gaps = gap_total(layout.gap, rows.len());

    let usable_width = screen_width
        .saturating_sub(layout.left)
        .saturating_sub(layout.right);
    let height_pool = screen_height
        .saturating_sub(layout.top)
        .saturating_sub(layout.bottom)
        .saturating_sub(row_gaps);
    let row_heights = distribute(height_pool, rows.len());

    let mut out = Vec::with_capacity(count);
    let mut y = i64::from(layout.top);
    for (&cols, &row_height) in rows.iter().zip(&row_heights) {
        let remaining = count - out.len();
        if remaining == 0 {
            break;
        }
        let cols = cols.min(remaining);
        let row_width = usable_width.saturating_sub(gap_total(layout.gap, cols));
        let mut x = i64::from(layout.left);
        for width in distribute(row_width, cols) {
            out.push(Rect::new(to_coord(x), to_coord(y), width, row_height));
            x += i64::from(width) + i64::from(layout.gap);
        }
        y += i64::from(row_height) + i64::from(layout.gap);
    }
    out
}

/// Total pixels taken by the gaps between `slots` neighbouring cells.
fn gap_total(gap: u32, slots: usize) -> u32 {
    let between = u32::try_from(slots.saturating_sub(1)).unwrap_or(u32::MAX);
    gap.saturating_mul(between)
}

fn to_coord(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}
