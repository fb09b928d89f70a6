//! CPAL-based audio output backend.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bl_ir::BLOCK_SIZE;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedBufferSize};

use crate::traits::{AudioError, AudioOutput, DeviceInfo, DynDispatcher};

/// How long `stop` waits for the callback to acknowledge.
const STOP_TIMEOUT: Duration = Duration::from_millis(250);

/// Bounds for the work buffer prepared from the device's buffer size.
const MIN_WORK_BLOCK: usize = 64;
const MAX_WORK_BLOCK: usize = 4096;

/// CPAL-based audio output.
///
/// The stream callback owns the dispatcher. The control side talks to it
/// only through atomics: `running` requests a stop, `released` acknowledges
/// that the dispatcher has been told, and `position` publishes the sample
/// count after every buffer.
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    info: DeviceInfo,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
    position: Arc<AtomicU64>,
}

impl CpalOutput {
    /// Open the default output device with its default config.
    pub fn open_default() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        if supported.sample_format() != SampleFormat::F32 {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?}",
                supported.sample_format()
            )));
        }

        let buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { max, .. } => Some(*max),
            SupportedBufferSize::Unknown => None,
        };
        let config: StreamConfig = supported.into();
        let info = DeviceInfo {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            buffer_size,
        };

        log::info!(
            "output device {:?}: {} Hz, {} channels",
            device.name().unwrap_or_else(|_| "<unnamed>".into()),
            info.sample_rate,
            info.channels
        );

        Ok(Self {
            device,
            config,
            info,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            released: Arc::new(AtomicBool::new(false)),
            position: Arc::new(AtomicU64::new(0)),
        })
    }

    fn work_block_size(&self) -> usize {
        self.info
            .buffer_size
            .map_or(BLOCK_SIZE, |n| n as usize)
            .clamp(MIN_WORK_BLOCK, MAX_WORK_BLOCK)
    }

    /// Build and start the audio stream.
    fn build_stream(&mut self, mut dispatcher: DynDispatcher) -> Result<Stream, AudioError> {
        let running = self.running.clone();
        let released = self.released.clone();
        let position = self.position.clone();
        let channels = self.config.channels as usize;
        let mut notified = false;

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if running.load(Ordering::Acquire) {
                        dispatcher.render_interleaved(data, channels);
                        position.store(dispatcher.clock().position(), Ordering::Relaxed);
                        return;
                    }

                    data.fill(0.0);
                    if !notified {
                        dispatcher.stopped();
                        notified = true;
                        released.store(true, Ordering::Release);
                    }
                },
                |err| log::error!("audio stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))
    }
}

impl AudioOutput for CpalOutput {
    fn info(&self) -> DeviceInfo {
        self.info
    }

    fn start(&mut self, mut dispatcher: DynDispatcher, channels: u16) -> Result<(), AudioError> {
        if self.stream.is_some() {
            self.stop()?;
        }

        let block = self.work_block_size();
        dispatcher.prepare(self.info.sample_rate as f64, block, channels);
        log::debug!(
            "prepared dispatcher: block {}, sub-block {}, {} work channels",
            block,
            dispatcher.max_sub_block(),
            channels
        );

        self.position.store(0, Ordering::Relaxed);
        self.released.store(false, Ordering::Relaxed);
        self.running.store(true, Ordering::Release);

        let stream = self.build_stream(dispatcher)?;
        if let Err(e) = stream.play() {
            self.running.store(false, Ordering::Release);
            return Err(AudioError::Playback(e.to_string()));
        }
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);

        // Let the callback deliver the stop notification on its own thread
        let deadline = Instant::now() + STOP_TIMEOUT;
        while !self.released.load(Ordering::Acquire) {
            if Instant::now() >= deadline {
                log::warn!("audio callback did not acknowledge stop within {:?}", STOP_TIMEOUT);
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        stream.pause().map_err(|e| AudioError::Playback(e.to_string()))
    }

    fn is_running(&self) -> bool {
        self.stream.is_some() && self.running.load(Ordering::Acquire)
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop audio stream: {}", e);
        }
    }
}
