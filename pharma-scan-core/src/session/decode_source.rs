use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crate::models::bitmap::Bitmap;
use crate::models::error::StreamError;
use crate::models::state::Generation;
use crate::models::symbology::FormatSet;
use crate::traits::camera_provider::VideoStream;
use crate::traits::symbol_decoder::{DecodeAttempt, SymbolDecoder};

/// Whether a live sampling loop keeps going after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Receiver of live decode results, keyed by session generation.
pub(crate) trait FrameSink: Send + Sync {
    fn decode_frame(&self, frame: &Bitmap) -> DecodeAttempt;

    fn frame_decoded(&self, generation: Generation, attempt: DecodeAttempt) -> LoopControl;

    fn stream_failed(&self, generation: Generation, err: StreamError);
}

/// Where a session's decode attempts come from.
#[derive(Debug)]
pub enum DecodeSource {
    LiveStream(LiveStreamSource),
    StillImage(StillImageSource),
}

impl DecodeSource {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::LiveStream(_))
    }

    fn kind(&self) -> &'static str {
        if self.is_live() {
            "live stream"
        } else {
            "still image"
        }
    }
}

impl std::fmt::Display for DecodeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Continuous frame sampling against a bound stream, on a dedicated thread.
///
/// Produces attempts until stopped or until the sink says stop. A result
/// computed after `stop()` is never handed to the sink.
#[derive(Debug)]
pub struct LiveStreamSource {
    generation: Generation,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LiveStreamSource {
    pub(crate) fn start(
        generation: Generation,
        stream: Arc<dyn VideoStream>,
        interval: Duration,
        sink: Weak<dyn FrameSink>,
    ) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name(format!("frame-sampler-{}", generation.value()))
            .spawn(move || sample_loop(generation, stream, interval, flag, sink))?;

        Ok(Self {
            generation,
            running,
            handle: Some(handle),
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop producing attempts. Does not wait for the thread.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }

    /// Stop and wait for the sampler thread, unless called from it.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("frame sampler for {} panicked", self.generation);
            }
        }
    }
}

fn sample_loop(
    generation: Generation,
    stream: Arc<dyn VideoStream>,
    interval: Duration,
    running: Arc<AtomicBool>,
    sink: Weak<dyn FrameSink>,
) {
    log::debug!("frame sampler started for {generation} ({interval:?} interval)");
    let mut next_sample = Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next_sample {
            thread::park_timeout(next_sample - now);
            continue;
        }
        next_sample = now + interval;

        let Some(sink) = sink.upgrade() else {
            break;
        };

        match stream.grab_frame() {
            Ok(Some(frame)) => {
                let attempt = sink.decode_frame(&frame);
                if !running.load(Ordering::SeqCst) {
                    log::debug!("dropping in-flight decode for {generation}");
                    break;
                }
                if sink.frame_decoded(generation, attempt) == LoopControl::Stop {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                if running.load(Ordering::SeqCst) {
                    sink.stream_failed(generation, err);
                }
                break;
            }
        }
    }

    log::debug!("frame sampler stopped for {generation}");
}

/// A single decode pass over one uploaded image.
#[derive(Debug)]
pub struct StillImageSource {
    image: Bitmap,
}

impl StillImageSource {
    pub fn new(image: Bitmap) -> Self {
        Self { image }
    }

    /// Run the one and only attempt.
    pub fn decode<D: SymbolDecoder + ?Sized>(self, decoder: &D, formats: &FormatSet) -> DecodeAttempt {
        if self.image.is_uniform() {
            return DecodeAttempt::NotFound;
        }
        decoder.decode(&self.image, formats)
    }
}
