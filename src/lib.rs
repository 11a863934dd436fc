pub mod codec;
pub mod common;
pub mod decoder;
pub mod error;
mod occupancy;
pub mod patch;
pub mod plr;
mod reconstruct;
pub mod reference;
pub mod syntax;
pub mod trace;
pub mod video;

use codec::{PointCloudGenerator, PointSet3};
use common::context::Context;
use crossbeam_channel as chan;
use error::Result;
use log::{error, info};
use std::path::PathBuf;
use std::thread;
use syntax::AtlasSyntax;
use trace::TraceMode;
use video::VideoDecoder;

pub use error::Error;

/// The library's decoder
pub struct Decoder {
    params: Params,
    // will be None once the decoder is started.
    tx: Option<chan::Sender<Result<PointSet3>>>,
    rx: chan::Receiver<Result<PointSet3>>,
}

/// Params to pass in to the library's decoder
#[derive(Debug, Clone)]
pub struct Params {
    /// JSON dump of the atlas syntax, see [`AtlasSyntax::from_file`].
    pub syntax_path: PathBuf,
    pub trace: TraceMode,
    /// Worker threads external stages may use.
    pub num_threads: usize,
    pub keep_intermediate_files: bool,
    /// Color transfer used after grid smoothing (1, 2 or 3).
    pub postprocess_smoothing_filter: u8,

    // reconstruction options
    pub pixel_deinterleaving_type: bool,
    pub point_local_reconstruction_type: bool,
    pub reconstruction_eom_type: bool,
    pub duplicated_point_removal_type: bool,
    pub reconstruct_raw_type: bool,
    pub apply_geo_smoothing_type: bool,
    pub apply_attr_smoothing_type: bool,
}

impl Params {
    /// Every reconstruction option on, tracing off.
    pub fn new(syntax_path: PathBuf) -> Self {
        Self {
            syntax_path,
            trace: TraceMode::Off,
            num_threads: 1,
            keep_intermediate_files: false,
            postprocess_smoothing_filter: 1,
            pixel_deinterleaving_type: true,
            point_local_reconstruction_type: true,
            reconstruction_eom_type: true,
            duplicated_point_removal_type: true,
            reconstruct_raw_type: true,
            apply_geo_smoothing_type: true,
            apply_attr_smoothing_type: true,
        }
    }

    pub fn with_trace(mut self, trace: TraceMode) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads.max(1);
        self
    }

    pub fn with_keep_intermediate_files(mut self, keep: bool) -> Self {
        self.keep_intermediate_files = keep;
        self
    }

    pub fn with_postprocess_smoothing_filter(mut self, filter: u8) -> Self {
        self.postprocess_smoothing_filter = filter;
        self
    }

    /// Turns every reconstruction option off (the "Rec0" configuration).
    pub fn without_reconstruction_options(mut self) -> Self {
        self.pixel_deinterleaving_type = false;
        self.point_local_reconstruction_type = false;
        self.reconstruction_eom_type = false;
        self.duplicated_point_removal_type = false;
        self.reconstruct_raw_type = false;
        self.apply_geo_smoothing_type = false;
        self.apply_attr_smoothing_type = false;
        self
    }
}

impl Decoder {
    pub fn new(params: Params) -> Self {
        let (tx, rx) = chan::bounded(1);
        Self {
            params,
            tx: Some(tx),
            rx,
        }
    }

    /// Spawns a thread to decode.
    /// The decoded point clouds can be retrieved in order by repeatedly calling `recv_frame()` until it returns None.
    /// A failed decode yields one `Err` and ends the stream.
    ///
    /// Caller needs to ensure that this function is only called once per Decoder instance. Calling more than once will return an error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::PathBuf;
    /// use vpcc_atlas::{Decoder, Params};
    /// # use vpcc_atlas::codec::{PointCloudGenerator, PointSet3, GeneratePointCloudParams, DecodedVideos};
    /// # use vpcc_atlas::common::context::FrameContext;
    /// # use vpcc_atlas::video::{CodecId, Pixel, Video, VideoDecoder};
    /// # struct Videos;
    /// # impl VideoDecoder for Videos {
    /// #     fn decode<T: Pixel>(&mut self, _: &[u8], _: CodecId) -> vpcc_atlas::error::Result<Video<T>> { Ok(Video::default()) }
    /// # }
    /// # struct Points;
    /// # impl PointCloudGenerator for Points {
    /// #     fn generate_point_cloud(&mut self, _: &FrameContext, _: &DecodedVideos, _: &GeneratePointCloudParams) -> vpcc_atlas::error::Result<PointSet3> { Ok(PointSet3::default()) }
    /// #     fn convert_yuv_to_rgb(&mut self, _: &mut PointSet3) -> vpcc_atlas::error::Result<()> { Ok(()) }
    /// # }
    ///
    /// let mut decoder = Decoder::new(Params::new(PathBuf::from("path/to/syntax.json")));
    /// decoder.start(Videos, Points).unwrap();
    /// for frame in decoder.into_iter() {
    ///    // do something with the frame
    /// }
    /// ```
    pub fn start<V, G>(&mut self, mut video_decoder: V, mut generator: G) -> Result<()>
    where
        V: VideoDecoder + Send + 'static,
        G: PointCloudGenerator + Send + 'static,
    {
        let tx = self
            .tx
            .take()
            .ok_or(Error::Unsupported("starting a decoder twice"))?;
        let params = self.params.clone();

        thread::spawn(move || {
            let result = AtlasSyntax::from_file(&params.syntax_path).and_then(|syntax| {
                let mut context = Context::new(syntax);
                decoder::Decoder::new(params).decode(&mut context, &mut video_decoder, &mut generator)
            });
            match result {
                Ok(frames) => {
                    info!("streaming {} reconstructed frames", frames.len());
                    for frame in frames {
                        if tx.send(Ok(frame)).is_err() {
                            // receiver dropped
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!("decoding failed: {}", e);
                    let _ = tx.send(Err(e));
                }
            }
            drop(tx);
        });
        Ok(())
    }

    /// Blocks the current thread until the next decoded frame is received.
    ///
    /// Once this method returns None, it will not block anymore as there are no more frames left to be decoded.
    pub fn recv_frame(&self) -> Option<Result<PointSet3>> {
        self.rx.recv().ok()
    }
}

impl Iterator for Decoder {
    type Item = Result<PointSet3>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv_frame()
    }
}
