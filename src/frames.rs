//! Frame acquisition boundary.
//!
//! The pipeline never touches video containers itself; it asks a
//! [`FrameProvider`] for JPEG bytes at a timestamp and decodes them here.
//! The underlying platform decoder is a shared, exhaustible resource, so a
//! [`FrameStore`]:
//!
//! - serializes decodes (one in flight at a time),
//! - retries transient failures with exponential backoff,
//! - caches decoded frames with bounded FIFO eviction (oldest inserted key
//!   leaves first), covering repeated timestamp queries such as UI scrubs,
//! - observes a cooperative `dispose` flag so a torn-down session fails
//!   fast instead of mutating a dead cache.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::error::TrackingError;
use crate::types::ImageSize;

/// A provider-side fetch or decode failure; retryable.
#[derive(Debug, Clone, Error)]
#[error("frame fetch failed at {time_ms} ms: {reason}")]
pub struct FrameFetchError {
    pub time_ms: i64,
    pub reason: String,
}

/// Source of encoded frames, typically backed by a platform video decoder.
///
/// Implementations may fail transiently; the store retries a bounded number
/// of times before the whole tracking run fails.
pub trait FrameProvider: Send + Sync {
    fn frame_jpeg(&self, time_ms: i64, quality: u8) -> Result<Vec<u8>, FrameFetchError>;
}

/// Owned interleaved RGB8 frame.
#[derive(Clone, Debug)]
pub struct FrameRgb8 {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl FrameRgb8 {
    /// Wrap raw interleaved RGB bytes; `data.len()` must be `w * h * 3`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height * 3);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Luma in [0, 255] using the BT.601 weights.
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> f64 {
        let [r, g, b] = self.pixel(x, y);
        0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
    }
}

/// Retry policy for frame decode failures.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts per timestamp, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(40),
        }
    }
}

/// Knobs of the decode cache.
#[derive(Clone, Copy, Debug)]
pub struct FrameStoreParams {
    /// Maximum number of decoded frames kept in memory.
    pub cache_capacity: usize,
    /// JPEG quality requested from the provider.
    pub jpeg_quality: u8,
    pub retry: RetryPolicy,
}

impl Default for FrameStoreParams {
    fn default() -> Self {
        Self {
            cache_capacity: 48,
            jpeg_quality: 85,
            retry: RetryPolicy::default(),
        }
    }
}

struct CacheInner {
    frames: HashMap<i64, FrameRgb8>,
    insertion_order: VecDeque<i64>,
}

/// Session-owned frame access: serialized decode, retry, FIFO cache.
pub struct FrameStore<'a> {
    provider: &'a dyn FrameProvider,
    params: FrameStoreParams,
    inner: Mutex<CacheInner>,
    disposed: AtomicBool,
}

impl<'a> FrameStore<'a> {
    pub fn new(provider: &'a dyn FrameProvider, params: FrameStoreParams) -> Self {
        Self {
            provider,
            params,
            inner: Mutex::new(CacheInner {
                frames: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
            disposed: AtomicBool::new(false),
        }
    }

    /// Mark the owning session as torn down; in-flight and future requests
    /// fail with [`TrackingError::Disposed`].
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Decoded frame at `time_ms`, from cache or via a serialized,
    /// retried fetch+decode.
    pub fn frame_at(&self, time_ms: i64) -> Result<FrameRgb8, TrackingError> {
        if self.is_disposed() {
            return Err(TrackingError::Disposed);
        }

        // Holding the lock across the fetch is what serializes decodes.
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(frame) = inner.frames.get(&time_ms) {
            return Ok(frame.clone());
        }

        let frame = self.fetch_with_retry(time_ms)?;
        if inner.frames.insert(time_ms, frame.clone()).is_none() {
            inner.insertion_order.push_back(time_ms);
        }
        while inner.insertion_order.len() > self.params.cache_capacity {
            if let Some(oldest) = inner.insertion_order.pop_front() {
                inner.frames.remove(&oldest);
            }
        }
        Ok(frame)
    }

    fn fetch_with_retry(&self, time_ms: i64) -> Result<FrameRgb8, TrackingError> {
        let mut backoff = self.params.retry.initial_backoff;
        let mut last = String::new();
        for attempt in 1..=self.params.retry.max_attempts {
            if self.is_disposed() {
                return Err(TrackingError::Disposed);
            }
            match self.try_fetch(time_ms) {
                Ok(frame) => return Ok(frame),
                Err(reason) => {
                    warn!(
                        "frame decode attempt {attempt}/{} failed at {time_ms} ms: {reason}",
                        self.params.retry.max_attempts
                    );
                    last = reason;
                }
            }
            if attempt < self.params.retry.max_attempts {
                std::thread::sleep(backoff);
                backoff *= 2;
            }
        }
        Err(TrackingError::DecodeExhausted {
            time_ms,
            attempts: self.params.retry.max_attempts,
            last,
        })
    }

    fn try_fetch(&self, time_ms: i64) -> Result<FrameRgb8, String> {
        let bytes = self
            .provider
            .frame_jpeg(time_ms, self.params.jpeg_quality)
            .map_err(|e| e.reason)?;
        let decoded = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
        let rgb = decoded.into_rgb8();
        let (w, h) = (rgb.width() as usize, rgb.height() as usize);
        debug!("decoded frame at {time_ms} ms ({w}x{h})");
        Ok(FrameRgb8::new(w, h, rgb.into_raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Provider that encodes a flat-color frame, failing the first
    /// `fail_first` calls per timestamp.
    struct FlakyProvider {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl FlakyProvider {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
            }
        }

        fn total_calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FrameProvider for FlakyProvider {
        fn frame_jpeg(&self, time_ms: i64, _quality: u8) -> Result<Vec<u8>, FrameFetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(FrameFetchError {
                    time_ms,
                    reason: "decoder busy".to_string(),
                });
            }
            Ok(encode_flat_jpeg(16, 12, [40, 110, 40]))
        }
    }

    fn encode_flat_jpeg(w: u32, h: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb(rgb));
        let mut out = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90)
            .encode_image(&img)
            .unwrap();
        out
    }

    fn quick_params() -> FrameStoreParams {
        FrameStoreParams {
            cache_capacity: 2,
            jpeg_quality: 85,
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
            },
        }
    }

    #[test]
    fn retries_transient_failures() {
        let provider = FlakyProvider::new(2);
        let store = FrameStore::new(&provider, quick_params());
        let frame = store.frame_at(0).expect("retry should succeed");
        assert_eq!(frame.size().width, 16);
        assert_eq!(provider.total_calls(), 3);
    }

    #[test]
    fn exhaustion_names_the_timestamp() {
        let provider = FlakyProvider::new(u32::MAX);
        let store = FrameStore::new(&provider, quick_params());
        match store.frame_at(1234) {
            Err(TrackingError::DecodeExhausted {
                time_ms, attempts, ..
            }) => {
                assert_eq!(time_ms, 1234);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn cache_hits_skip_the_provider() {
        let provider = FlakyProvider::new(0);
        let store = FrameStore::new(&provider, quick_params());
        store.frame_at(10).unwrap();
        store.frame_at(10).unwrap();
        assert_eq!(provider.total_calls(), 1);
    }

    #[test]
    fn fifo_evicts_oldest_insertion() {
        let provider = FlakyProvider::new(0);
        let store = FrameStore::new(&provider, quick_params());
        store.frame_at(0).unwrap();
        store.frame_at(33).unwrap();
        store.frame_at(66).unwrap(); // evicts t=0
        assert_eq!(provider.total_calls(), 3);
        store.frame_at(33).unwrap(); // still cached
        assert_eq!(provider.total_calls(), 3);
        store.frame_at(0).unwrap(); // refetch
        assert_eq!(provider.total_calls(), 4);
    }

    #[test]
    fn disposed_store_fails_fast() {
        let provider = FlakyProvider::new(0);
        let store = FrameStore::new(&provider, quick_params());
        store.dispose();
        assert!(matches!(store.frame_at(0), Err(TrackingError::Disposed)));
        assert_eq!(provider.total_calls(), 0);
    }
}
