// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Gradient palettes.
//!
//! Every palette here is built the same way: a handful of colors are
//! pinned to specific slots, and every slot between two pinned colors
//! is filled by linear interpolation, channel by channel.  The
//! renderer maps each escaped pixel onto a slot through the
//! cumulative histogram, so long smooth gradients with a few sharp
//! bands near the top end tend to look best.

use crate::color::{Color, Palette};
use crate::error::{MandelError, Result};
use std::collections::BTreeMap;

/// Number of slots in every registered palette.
pub const REGISTRY_PALETTE_SIZE: usize = 256;

/// A color pinned to a palette slot while building a gradient.  Control
/// points only exist during construction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControlPoint {
    /// Palette slot the color is pinned to.
    pub index: usize,
    /// The color at that slot.
    pub color: Color,
}

impl ControlPoint {
    /// Pins `color` to slot `index`.
    pub const fn new(index: usize, color: Color) -> ControlPoint {
        ControlPoint { index, color }
    }
}

#[inline]
fn lerp_channel(start: u8, end: u8, i: usize, span: usize) -> u8 {
    let (start, end) = (i64::from(start), i64::from(end));
    (start + (i as i64) * (end - start) / (span as i64)) as u8
}

/// Interpolates linearly between the first and the last colors of
/// `pal`, overwriting every slot in between.  Integer division
/// truncates, so interior values can sit up to one step short of the
/// exact line.  Slices of two or fewer colors are left alone.
pub fn linterp(pal: &mut [Color]) {
    let n = pal.len();
    if n <= 2 {
        return;
    }
    let (s, e) = (pal[0], pal[n - 1]);
    let span = n - 1;
    for (i, slot) in pal.iter_mut().enumerate().take(n - 1).skip(1) {
        *slot = Color {
            r: lerp_channel(s.r, e.r, i, span),
            g: lerp_channel(s.g, e.g, i, span),
            b: lerp_channel(s.b, e.b, i, span),
            a: lerp_channel(s.a, e.a, i, span),
        };
    }
}

/// Fills `pal` with a gradient running through `pts`.
///
/// Each control color lands on its index and every run between two
/// neighboring points is interpolated, endpoints included.  Nothing
/// is extrapolated: slots before the first point or after the last
/// one keep whatever they held.
///
/// ```text
///   pts:  0 -> black,  255 -> red,  510 -> black
///
///   +---+---+       +---+---+---+       +---+---+
///   | 0 | 1   ...    FE | FF | FE  ...    1 | 0 |   red channel
///   +---+---+       +---+---+---+       +---+---+
///     0   1          254 255 256          509 510
/// ```
///
/// Points must be sorted by strictly increasing index and every index
/// must fall inside the palette.  At least two points are required.
pub fn lin_grad(pts: &[ControlPoint], pal: &mut [Color]) -> Result<()> {
    if pts.len() < 2 {
        return Err(MandelError::invalid(format!(
            "a gradient needs at least 2 control points, got {}",
            pts.len()
        )));
    }
    if let Some(p) = pts.iter().find(|p| p.index >= pal.len()) {
        return Err(MandelError::invalid(format!(
            "control point index {} is outside a palette of {} colors",
            p.index,
            pal.len()
        )));
    }
    if pts.windows(2).any(|w| w[1].index <= w[0].index) {
        return Err(MandelError::invalid(
            "control points must be sorted by index, without repeats",
        ));
    }

    pal[pts[0].index] = pts[0].color;
    for w in pts.windows(2) {
        pal[w[1].index] = w[1].color;
        linterp(&mut pal[w[0].index..=w[1].index]);
    }
    Ok(())
}

/// Builds a palette of `size` colors by spreading `colors` evenly
/// across it: the first color goes to slot 0, the last to slot
/// `size - 1`, the ones in between at equal distances, and every
/// remaining slot is interpolated.  Between 2 and `size` colors must
/// be given.
pub fn lin_grad_sized(colors: &[Color], size: usize) -> Result<Palette> {
    let n = colors.len();
    if n < 2 || n > size {
        return Err(MandelError::invalid(format!(
            "cannot spread {} colors over a palette of {}",
            n, size
        )));
    }
    let mut pal = vec![Color::default(); size];
    pal[0] = colors[0];
    let mut prev = 0;
    for (i, color) in colors.iter().enumerate().take(n - 1).skip(1) {
        let slot = i * size / (n - 1);
        pal[slot] = *color;
        linterp(&mut pal[prev..=slot]);
        prev = slot;
    }
    pal[size - 1] = colors[n - 1];
    linterp(&mut pal[prev..]);
    Ok(Palette::new(pal))
}

/// A grayscale ramp of `size` colors from `(0, 0, 0, alpha)` up to
/// `(alpha, alpha, alpha, alpha)`, or the other way round when
/// `reverse` is set.
pub fn gray_palette(size: usize, alpha: u8, reverse: bool) -> Result<Palette> {
    let mut ends = [
        Color::new(0, 0, 0, alpha),
        Color::new(alpha, alpha, alpha, alpha),
    ];
    if reverse {
        ends.swap(0, 1);
    }
    lin_grad_sized(&ends, size)
}

fn control_palette(pts: &[ControlPoint]) -> Result<Palette> {
    let mut pal = vec![Color::default(); REGISTRY_PALETTE_SIZE];
    lin_grad(pts, &mut pal)?;
    Ok(Palette::new(pal))
}

const GOLD1: [ControlPoint; 4] = [
    ControlPoint::new(0, Color::rgb(0x00, 0x00, 0x00)),
    ControlPoint::new(220, Color::rgb(0x77, 0x55, 0x00)),
    ControlPoint::new(245, Color::rgb(0xff, 0xff, 0x00)),
    ControlPoint::new(255, Color::rgb(0xff, 0xff, 0xff)),
];

const GOLD2: [ControlPoint; 9] = [
    ControlPoint::new(0, Color::rgb(0x00, 0x00, 0x00)),
    ControlPoint::new(75, Color::rgb(0x77, 0x22, 0x00)),
    ControlPoint::new(100, Color::rgb(0xff, 0xff, 0x00)),
    ControlPoint::new(125, Color::rgb(0xff, 0xff, 0xff)),
    ControlPoint::new(150, Color::rgb(0x77, 0x22, 0x00)),
    ControlPoint::new(200, Color::rgb(0x00, 0x00, 0x00)),
    ControlPoint::new(225, Color::rgb(0x77, 0x22, 0x00)),
    ControlPoint::new(240, Color::rgb(0xff, 0xff, 0x00)),
    ControlPoint::new(255, Color::rgb(0xff, 0xff, 0xff)),
];

const BLUE1: [ControlPoint; 4] = [
    ControlPoint::new(0, Color::rgb(0x00, 0x00, 0x00)),
    ControlPoint::new(220, Color::rgb(0x00, 0x00, 0x55)),
    ControlPoint::new(245, Color::rgb(0x44, 0x44, 0xff)),
    ControlPoint::new(255, Color::rgb(0xff, 0xff, 0xff)),
];

const BLUE2: [ControlPoint; 9] = [
    ControlPoint::new(0, Color::rgb(0x00, 0x00, 0x00)),
    ControlPoint::new(50, Color::rgb(0x22, 0x22, 0x55)),
    ControlPoint::new(100, Color::rgb(0x10, 0x10, 0x55)),
    ControlPoint::new(150, Color::rgb(0xff, 0xff, 0xff)),
    ControlPoint::new(175, Color::rgb(0x55, 0x55, 0xff)),
    ControlPoint::new(200, Color::rgb(0x22, 0x22, 0x77)),
    ControlPoint::new(225, Color::rgb(0x00, 0x00, 0x20)),
    ControlPoint::new(240, Color::rgb(0x22, 0x22, 0x77)),
    ControlPoint::new(255, Color::rgb(0xff, 0xff, 0xff)),
];

/// Name of the palette handed out when the caller does not pick one.
pub const DEFAULT_PALETTE: &str = "gray";

/// The named palettes a caller can choose from.  Build it once with
/// [`registry`] at startup and share it; it never changes afterwards.
#[derive(Clone, Debug)]
pub struct PaletteRegistry {
    palettes: BTreeMap<&'static str, Palette>,
}

impl PaletteRegistry {
    /// Looks a palette up by name.
    pub fn get(&self, name: &str) -> Result<Palette> {
        self.palettes
            .get(name)
            .cloned()
            .ok_or_else(|| MandelError::UnknownPalette(name.to_string()))
    }

    /// The palette used when none is asked for.
    pub fn default_palette(&self) -> Palette {
        self.palettes[DEFAULT_PALETTE].clone()
    }

    /// Registered names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.palettes.keys().cloned()
    }

    /// Number of registered palettes.
    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    /// True if no palette is registered.
    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }
}

/// Builds every named palette.
pub fn registry() -> Result<PaletteRegistry> {
    let mut palettes = BTreeMap::new();
    palettes.insert("gray", gray_palette(REGISTRY_PALETTE_SIZE, 0xff, false)?);
    palettes.insert("grayr", gray_palette(REGISTRY_PALETTE_SIZE, 0xff, true)?);
    palettes.insert("gold1", control_palette(&GOLD1)?);
    palettes.insert("gold2", control_palette(&GOLD2)?);
    palettes.insert("blue1", control_palette(&BLUE1)?);
    palettes.insert("blue2", control_palette(&BLUE2)?);
    Ok(PaletteRegistry { palettes })
}
