#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelbrot renderer
//!
//! The Mandelbrot set is the set of points `c` on the complex plane
//! for which `z = z * z + c`, iterated from zero, never runs off to
//! infinity.  Rendering it means counting, for every pixel, how many
//! iterations its point takes to leave a circle of some escape
//! radius, and turning that count into a color.
//!
//! This crate does the counting, colors the result through a
//! histogram so that the palette is spread evenly over whatever part
//! of the plane is on screen, builds gradient palettes to color with,
//! and keeps recent renders in a small cache so that the same view can
//! be served again, in any palette, without rendering it twice.
//!
//! ```no_run
//! use mandel::{RenderCache, ViewArgs, registry};
//!
//! let palettes = registry().unwrap();
//! let cache = RenderCache::new();
//! let view = ViewArgs { iterations: Some("256"), ..ViewArgs::default() }.fingerprint();
//! let img = cache
//!     .get_or_render(&view, 2.0, 4, &palettes.get("gold1").unwrap())
//!     .unwrap();
//! img.to_rgba_image().save("gold.png").unwrap();
//! ```

pub mod cache;
pub mod color;
pub mod error;
pub mod mandel;
pub mod palette;
pub mod params;
pub mod planes;

pub use crate::cache::{Fingerprint, RenderCache, CACHE_SIZE};
pub use crate::color::{Color, Palette};
pub use crate::error::{MandelError, Result};
pub use crate::mandel::{render, MandelRenderer, RenderedImage};
pub use crate::palette::{
    gray_palette, lin_grad, lin_grad_sized, linterp, registry, ControlPoint, PaletteRegistry,
};
pub use crate::params::ViewArgs;
