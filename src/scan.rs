//! The periodic sample-and-decode loop.
//!
//! A [`ScanLoop`] owns a decoder and, while a session is active, one video
//! source. Every period it samples a frame, decodes it and hands the
//! [`ScanResult`] to the session callback, hit or miss. A successful decode
//! does not end the session; only [`SessionHandle::stop`] does.
//!
//! Sessions run as a task on the ambient Tokio runtime. A tick runs to
//! completion before the next one is awaited, and ticks that fall due
//! while one is still running are skipped rather than queued.

use crate::decode::{Decode, PayloadDecoder, ScanResult};
use crate::error::{Error, Result};
use crate::frame::{FrameSampler, VideoSource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Scan cadence.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub period_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { period_ms: 100 }
    }
}

impl ScanConfig {
    pub fn with_period(period: Duration) -> Self {
        Self {
            period_ms: u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.period_ms == 0 {
            return Err(Error::Config("scan period must be positive".to_string()));
        }
        Ok(())
    }

    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScanState {
    Idle,
    Active,
}

/// Something that can hand out a live video stream, typically after asking
/// the user for camera permission.
#[async_trait]
pub trait CameraProvider: Send {
    type Video: VideoSource + 'static;

    async fn acquire(&mut self) -> Result<Self::Video>;
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SessionInner {
    active: AtomicBool,
    ticks: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
    video: Mutex<Box<dyn VideoSource>>,
}

/// Handle to one running scan session.
///
/// Clones share the session. [`stop`](Self::stop) may be called any number
/// of times, from any clone, including from inside the result callback.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state())
            .field("ticks", &self.ticks())
            .finish()
    }
}

impl SessionHandle {
    fn new(video: Box<dyn VideoSource>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                active: AtomicBool::new(true),
                ticks: AtomicU64::new(0),
                task: Mutex::new(None),
                video: Mutex::new(video),
            }),
        }
    }

    fn attach(&self, task: JoinHandle<()>) {
        if self.is_active() {
            *lock(&self.inner.task) = Some(task);
        } else {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ScanState {
        if self.is_active() {
            ScanState::Active
        } else {
            ScanState::Idle
        }
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::SeqCst)
    }

    /// Cancels the timer and releases the video source. Only the first call
    /// does anything.
    pub fn stop(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = lock(&self.inner.task).take() {
            task.abort();
        }
        lock(&self.inner.video).release();
        log::debug!("scan session stopped after {} ticks", self.ticks());
    }

    fn run_tick<D: Decode>(
        &self,
        sampler: &FrameSampler,
        decoder: &Mutex<PayloadDecoder<D>>,
    ) -> ScanResult {
        let frame = {
            let mut video = lock(&self.inner.video);
            // stop() may have released the source while this tick waited
            // for the lock.
            if !self.is_active() {
                return ScanResult::NoResult;
            }
            sampler.sample(&mut **video)
        };
        let tick = self.inner.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        log::trace!("tick {tick}");
        match frame {
            Some(frame) => lock(decoder).decode(&frame),
            None => {
                log::trace!("tick {tick}: video has no frame yet");
                ScanResult::NoResult
            }
        }
    }
}

/// Drives sampling and decoding on a fixed period.
pub struct ScanLoop<D> {
    decoder: Arc<Mutex<PayloadDecoder<D>>>,
    sampler: FrameSampler,
    config: ScanConfig,
    current: Option<SessionHandle>,
}

impl<D: Decode + 'static> ScanLoop<D> {
    pub fn new(decoder: D, config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decoder: Arc::new(Mutex::new(PayloadDecoder::new(decoder))),
            sampler: FrameSampler::new(),
            config,
            current: None,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> ScanState {
        self.current
            .as_ref()
            .map_or(ScanState::Idle, SessionHandle::state)
    }

    /// Starts scanning `video`, calling `callback` once per tick.
    ///
    /// Any session previously started from this loop is stopped first. The
    /// first tick fires one period after the call.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<V, F>(&mut self, video: V, mut callback: F) -> SessionHandle
    where
        V: VideoSource + 'static,
        F: FnMut(ScanResult) + Send + 'static,
    {
        self.stop();

        let session = SessionHandle::new(Box::new(video));
        let task_session = session.clone();
        let decoder = Arc::clone(&self.decoder);
        let sampler = self.sampler;
        let period = self.config.period();
        let first_tick = Instant::now() + period;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut found = false;
            loop {
                ticker.tick().await;
                let result = task_session.run_tick(&sampler, &decoder);
                if !task_session.is_active() {
                    break;
                }
                if !found && result.is_text() {
                    found = true;
                    log::info!("payload decoded after {} ticks", task_session.ticks());
                }
                callback(result);
            }
        });
        session.attach(task);

        log::debug!("scan session started, period {:?}", period);
        self.current = Some(session.clone());
        session
    }

    /// Acquires a stream from `camera` and starts scanning it.
    ///
    /// Any running session is stopped before the camera is asked. If
    /// acquisition fails the error is logged and returned, and the loop
    /// stays idle.
    pub async fn start_with_camera<C, F>(
        &mut self,
        camera: &mut C,
        callback: F,
    ) -> Result<SessionHandle>
    where
        C: CameraProvider,
        F: FnMut(ScanResult) + Send + 'static,
    {
        self.stop();
        match camera.acquire().await {
            Ok(video) => Ok(self.start(video, callback)),
            Err(e) => {
                log::error!("error accessing camera: {e}");
                Err(e)
            }
        }
    }

    /// Stops the current session, if any.
    pub fn stop(&mut self) {
        if let Some(session) = self.current.take() {
            session.stop();
        }
    }
}

impl<D> Drop for ScanLoop<D> {
    fn drop(&mut self) {
        if let Some(session) = self.current.take() {
            session.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_and_json() {
        assert_eq!(ScanConfig::default().period(), Duration::from_millis(100));
        let config = ScanConfig::from_json_str(r#"{"period_ms": 250}"#).unwrap();
        assert_eq!(config.period(), Duration::from_millis(250));
        assert_eq!(ScanConfig::from_json_str("{}").unwrap(), ScanConfig::default());
        assert!(matches!(
            ScanConfig::from_json_str(r#"{"period_ms": 0}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_huge_period_saturates() {
        assert_eq!(ScanConfig::with_period(Duration::MAX).period_ms, u64::MAX);
        assert_eq!(
            ScanConfig::with_period(Duration::from_millis(250)).period_ms,
            250
        );
    }

    struct DrawCounter {
        draws: Arc<AtomicU64>,
        released: bool,
    }

    impl VideoSource for DrawCounter {
        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn draw_rgba(&mut self, rgba: &mut [u8]) {
            assert!(!self.released, "draw after release");
            self.draws.fetch_add(1, Ordering::SeqCst);
            rgba.fill(0);
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    #[test]
    fn test_tick_after_stop_does_not_sample() {
        let draws = Arc::new(AtomicU64::new(0));
        let session = SessionHandle::new(Box::new(DrawCounter {
            draws: Arc::clone(&draws),
            released: false,
        }));
        let decoder = Mutex::new(PayloadDecoder::new(crate::decode::QrDecoder));
        let sampler = FrameSampler::new();

        assert_eq!(session.run_tick(&sampler, &decoder), ScanResult::NoResult);
        assert_eq!(draws.load(Ordering::SeqCst), 1);

        session.stop();
        assert_eq!(session.run_tick(&sampler, &decoder), ScanResult::NoResult);
        assert_eq!(draws.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = ScanConfig::with_period(Duration::ZERO);
        assert!(ScanLoop::new(crate::decode::QrDecoder, config).is_err());
    }

    #[test]
    fn test_new_loop_is_idle() {
        let scan = ScanLoop::new(crate::decode::QrDecoder, ScanConfig::default()).unwrap();
        assert_eq!(scan.state(), ScanState::Idle);
    }
}
