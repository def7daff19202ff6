// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A small cache of recent renders.
//!
//! The cache keeps the last few rendered images so that asking for the
//! same view again, possibly with another palette, costs a lookup
//! instead of a render.  Its entry list belongs to a single worker
//! thread; callers talk to it over one channel and wait for the reply,
//! so requests are handled one at a time, strictly in arrival order,
//! and no lock is ever taken around the list.

use crate::color::Palette;
use crate::error::Result;
use crate::mandel::{MandelRenderer, RenderedImage};
use crossbeam::channel::{bounded, unbounded, Sender};
use log::{debug, error};
use num::Complex;
use std::collections::VecDeque;
use std::thread::{self, JoinHandle};

/// Number of images kept by a default cache.
pub const CACHE_SIZE: usize = 10;

/// The parameters that decide what a render looks like, minus the
/// palette: image size, iteration cap, and the viewport corners
/// `(x0, y0)` and `(x1, y1)`.  Two renders with equal fingerprints
/// hold the same iteration data.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fingerprint {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Iteration cap.
    pub max_iter: u32,
    /// Real part of the corner at pixel 0,0.
    pub x0: f64,
    /// Imaginary part of the corner at pixel 0,0.
    pub y0: f64,
    /// Real part of the opposite corner.
    pub x1: f64,
    /// Imaginary part of the opposite corner.
    pub y1: f64,
}

impl Fingerprint {
    /// The corner at pixel 0,0.
    pub fn c0(&self) -> Complex<f64> {
        Complex::new(self.x0, self.y0)
    }

    /// The opposite corner.
    pub fn c1(&self) -> Complex<f64> {
        Complex::new(self.x1, self.y1)
    }

    /// A renderer for this view with the given escape radius.
    pub fn renderer(&self, radius: f64) -> Result<MandelRenderer> {
        MandelRenderer::new(
            self.width,
            self.height,
            self.c0(),
            self.c1(),
            self.max_iter,
            radius,
        )
    }
}

enum Request {
    Lookup(Fingerprint, Sender<Option<RenderedImage>>),
    Insert(RenderedImage, Sender<()>),
    Len(Sender<usize>),
}

// The entry list itself.  Only ever touched by the worker thread.
struct Entries {
    list: VecDeque<RenderedImage>,
    capacity: usize,
}

impl Entries {
    fn search(&self, fingerprint: &Fingerprint) -> Option<&RenderedImage> {
        self.list
            .iter()
            .find(|img| img.fingerprint() == *fingerprint)
    }

    fn add(&mut self, img: RenderedImage) {
        let fingerprint = img.fingerprint();
        if self.search(&fingerprint).is_some() {
            debug!("cache already holds {:?}", fingerprint);
            return;
        }
        self.list.push_back(img);
        while self.list.len() > self.capacity {
            if let Some(old) = self.list.pop_front() {
                debug!("cache evicted {:?}", old.fingerprint());
            }
        }
    }

    fn handle(&mut self, request: Request) {
        // A caller that went away before its reply is not our problem.
        match request {
            Request::Lookup(fingerprint, reply) => {
                let found = self.search(&fingerprint).cloned();
                debug!(
                    "cache {} for {:?}",
                    if found.is_some() { "hit" } else { "miss" },
                    fingerprint
                );
                let _ = reply.send(found);
            }
            Request::Insert(img, reply) => {
                self.add(img);
                let _ = reply.send(());
            }
            Request::Len(reply) => {
                let _ = reply.send(self.list.len());
            }
        }
    }
}

/// A bounded, first-in first-out store of rendered images.
///
/// Lookups match on [`Fingerprint`] only, never on palette, so an
/// image coming out of the cache may carry someone else's palette:
/// always repalette what you get back (or use
/// [`RenderCache::get_or_render`], which does).
///
/// Every call blocks until the worker has answered it.  There is no
/// timeout.  Dropping the cache stops the worker.
pub struct RenderCache {
    requests: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl RenderCache {
    /// A cache holding up to [`CACHE_SIZE`] images.
    pub fn new() -> RenderCache {
        RenderCache::with_capacity(CACHE_SIZE)
    }

    /// A cache holding up to `capacity` images.
    pub fn with_capacity(capacity: usize) -> RenderCache {
        let (tx, rx) = unbounded::<Request>();
        let worker = thread::spawn(move || {
            let mut entries = Entries {
                list: VecDeque::with_capacity(capacity + 1),
                capacity,
            };
            while let Ok(request) = rx.recv() {
                entries.handle(request);
            }
            debug!("render cache worker exiting");
        });
        RenderCache {
            requests: Some(tx),
            worker: Some(worker),
        }
    }

    fn request<T, F>(&self, make: F) -> Option<T>
    where
        F: FnOnce(Sender<T>) -> Request,
    {
        let requests = self.requests.as_ref()?;
        let (reply, answer) = bounded(1);
        if requests.send(make(reply)).is_err() {
            error!("render cache worker is gone");
            return None;
        }
        match answer.recv() {
            Ok(value) => Some(value),
            Err(_) => {
                error!("render cache worker dropped a request");
                None
            }
        }
    }

    /// The cached image with this fingerprint, if there is one.  A
    /// lookup never changes the cache.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<RenderedImage> {
        self.request(|reply| Request::Lookup(*fingerprint, reply))
            .and_then(|found| found)
    }

    /// Adds an image to the cache.  Adding an image whose fingerprint
    /// is already cached does nothing; in particular it does not make
    /// the cached entry any younger.  Once the cache is over capacity
    /// the oldest entry is evicted.
    pub fn insert(&self, img: RenderedImage) {
        self.request(|reply| Request::Insert(img, reply));
    }

    /// Number of cached images.
    pub fn len(&self) -> usize {
        self.request(Request::Len).unwrap_or(0)
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the image for `fingerprint` painted with `palette`,
    /// rendering it on `threads` threads and caching it if it is not
    /// cached yet.
    pub fn get_or_render(
        &self,
        fingerprint: &Fingerprint,
        radius: f64,
        threads: usize,
        palette: &Palette,
    ) -> Result<RenderedImage> {
        if let Some(img) = self.lookup(fingerprint) {
            return Ok(img.repalette(palette.clone()));
        }
        let img = fingerprint.renderer(radius)?.render(palette.clone(), threads);
        self.insert(img.clone());
        Ok(img)
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        RenderCache::new()
    }
}

impl Drop for RenderCache {
    fn drop(&mut self) {
        // Closing the channel ends the worker's receive loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("render cache worker panicked");
            }
        }
    }
}
