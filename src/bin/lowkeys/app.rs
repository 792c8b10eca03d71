//! Audio output: opens the default cpal device and renders the shared graph
//! into it, tapping every rendered block for the oscilloscope.

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, PushError, RingBuffer};
use tracing::{error, info};

use lowkeys::{
    graph::{AudioGraph, SharedGraph},
    MAX_BLOCK_SIZE,
};

/// Samples the scope ring can hold before the audio side starts dropping.
pub const SCOPE_RING_LEN: usize = 1024 * 16;

/// Graph clock rate used when no device could be opened. Nothing renders
/// then, so the value only has to be valid.
const FALLBACK_SAMPLE_RATE: f32 = 48_000.0;

/// A running output stream. Audio stops when this is dropped.
pub struct AudioOutput {
    _stream: cpal::Stream,
    pub sample_rate: f32,
}

/// Everything the UI needs from the audio side.
pub struct AudioSetup {
    pub graph: SharedGraph,
    pub scope: Consumer<f32>,
    pub output: Option<AudioOutput>,
}

impl AudioSetup {
    /// A graph nobody renders, for when the device is unavailable.
    pub fn silent() -> Self {
        let (_, scope) = RingBuffer::<f32>::new(1);
        Self {
            graph: SharedGraph::new(AudioGraph::new(FALLBACK_SAMPLE_RATE)),
            scope,
            output: None,
        }
    }
}

pub fn open_audio() -> EyreResult<AudioSetup> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    let graph = SharedGraph::new(AudioGraph::new(sample_rate));
    let (scope_tx, scope) = RingBuffer::<f32>::new(SCOPE_RING_LEN);

    let stream = device
        .build_output_stream(
            &config.into(),
            {
                let graph = graph.clone();
                let mut scope_tx = scope_tx;
                let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];
                move |data: &mut [f32], _| {
                    let total_frames = data.len() / channels;
                    let mut frames_written = 0;
                    while frames_written < total_frames {
                        let frames_to_render = (total_frames - frames_written).min(MAX_BLOCK_SIZE);

                        let block = &mut render_buf[..frames_to_render];
                        graph.render(block);

                        // Mono to every channel
                        let out_off = frames_written * channels;
                        for (i, &s) in block.iter().enumerate() {
                            let frame = out_off + i * channels;
                            data[frame..frame + channels].fill(s);
                        }

                        for &s in block.iter() {
                            if let Err(PushError::Full(_)) = scope_tx.push(s) {
                                break;
                            }
                        }

                        frames_written += frames_to_render;
                    }
                }
            },
            move |err| error!(%err, "output stream error"),
            None,
        )
        .wrap_err("failed to build output stream")?;

    stream.play().wrap_err("failed to start output stream")?;
    info!(sample_rate, channels, device = ?device.name().ok(), "audio output running");

    Ok(AudioSetup {
        graph,
        scope,
        output: Some(AudioOutput {
            _stream: stream,
            sample_rate,
        }),
    })
}
