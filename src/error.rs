// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type shared by the renderer, the palette builders and the
//! palette registry.

use failure::Fail;
use std::result;

/// Everything in this crate that can fail does so with one of these.
/// A cache miss is not an error; lookups return `None` for that.
#[derive(Debug, Fail, PartialEq)]
pub enum MandelError {
    /// A size, iteration cap, escape radius or control-point set was
    /// out of the range an operation can work with.
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(String),

    /// No palette is registered under the requested name.
    #[fail(display = "unknown palette: {}", _0)]
    UnknownPalette(String),
}

impl MandelError {
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        MandelError::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the library.
pub type Result<T> = result::Result<T, MandelError>;
