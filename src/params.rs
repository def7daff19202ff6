// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Request parameters, as a front end receives them: raw strings that
//! may be missing, malformed or out of range.  Everything here is
//! forgiving; a value that does not parse takes its default and a
//! value out of range is clamped into it, so what comes out is always
//! fit to hand to the renderer.

use crate::cache::Fingerprint;
use num::clamp;
use std::convert::TryFrom;
use std::str::FromStr;

/// A value a request parameter can be read as.
pub trait Param: Copy + PartialOrd {
    /// Reads `raw`, or gives `None` if it is not a number of this
    /// kind at all.  Numbers outside the type's own range saturate.
    fn read(raw: &str) -> Option<Self>;
}

// Counts go through i64 so that a negative count clamps to the
// minimum.
macro_rules! count_param {
    ($t:ty) => {
        impl Param for $t {
            fn read(raw: &str) -> Option<$t> {
                i64::from_str(raw)
                    .ok()
                    .map(|v| <$t>::try_from(v.max(0)).unwrap_or(<$t>::max_value()))
            }
        }
    };
}

count_param!(usize);
count_param!(u32);

impl Param for f64 {
    fn read(raw: &str) -> Option<f64> {
        f64::from_str(raw).ok().filter(|v| !v.is_nan())
    }
}

/// The accepted range of a parameter and the value it takes when none
/// is given.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds<T> {
    /// Smallest accepted value.
    pub min: T,
    /// Largest accepted value.
    pub max: T,
    /// Value used when the parameter is missing or unreadable.
    pub default: T,
}

impl<T: Param> Bounds<T> {
    /// Pulls `value` into `[min, max]`.
    pub fn clamp(&self, value: T) -> T {
        clamp(value, self.min, self.max)
    }

    /// Parses and clamps `raw`.  Missing and unparseable values, and
    /// NaN, give the default.
    pub fn parse(&self, raw: Option<&str>) -> T {
        raw.and_then(|s| T::read(s.trim()))
            .map(|v| self.clamp(v))
            .unwrap_or(self.default)
    }
}

/// Image width in pixels.
pub const WIDTH: Bounds<usize> = Bounds {
    min: 320,
    max: 5120,
    default: 640,
};

/// Image height in pixels.
pub const HEIGHT: Bounds<usize> = Bounds {
    min: 240,
    max: 4096,
    default: 480,
};

/// Iterations per pixel.
pub const ITERATIONS: Bounds<u32> = Bounds {
    min: 16,
    max: 10240,
    default: 64,
};

/// Real part of the first corner.
pub const X0: Bounds<f64> = Bounds {
    min: -2.0,
    max: 1.0,
    default: -2.0,
};

/// Real part of the second corner.
pub const X1: Bounds<f64> = Bounds {
    min: -2.0,
    max: 1.0,
    default: 1.0,
};

/// Imaginary part of the first corner.
pub const Y0: Bounds<f64> = Bounds {
    min: -1.2,
    max: 1.2,
    default: -1.2,
};

/// Imaginary part of the second corner.
pub const Y1: Bounds<f64> = Bounds {
    min: -1.2,
    max: 1.2,
    default: 1.2,
};

/// Escape radius used when the caller does not choose one.
pub const DEFAULT_RADIUS: f64 = 2.0;

/// The raw view parameters of one request.
#[derive(Copy, Clone, Debug, Default)]
pub struct ViewArgs<'a> {
    /// Image width, see [`WIDTH`].
    pub width: Option<&'a str>,
    /// Image height, see [`HEIGHT`].
    pub height: Option<&'a str>,
    /// Iteration cap, see [`ITERATIONS`].
    pub iterations: Option<&'a str>,
    /// See [`X0`].
    pub x0: Option<&'a str>,
    /// See [`Y0`].
    pub y0: Option<&'a str>,
    /// See [`X1`].
    pub x1: Option<&'a str>,
    /// See [`Y1`].
    pub y1: Option<&'a str>,
}

impl<'a> ViewArgs<'a> {
    /// The cache key and render parameters for this request, with
    /// every value parsed, defaulted and clamped.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            width: WIDTH.parse(self.width),
            height: HEIGHT.parse(self.height),
            max_iter: ITERATIONS.parse(self.iterations),
            x0: X0.parse(self.x0),
            y0: Y0.parse(self.y0),
            x1: X1.parse(self.x1),
            y1: Y1.parse(self.y1),
        }
    }
}
