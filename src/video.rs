use std::fmt;
use std::path::PathBuf;

use log::debug;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::common::ColorFormat;
use crate::error::{Error, Result};

/// Identifies one video sub-bitstream of a V3C sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoType {
    Occupancy,
    /// Single geometry stream holding every map.
    Geometry,
    /// Geometry map `n` when maps are carried in separate streams.
    GeometryD(u8),
    /// Raw (auxiliary) geometry.
    GeometryRaw,
    Attribute {
        index: u8,
        partition: u8,
        /// `None` for a single stream holding every map.
        map: Option<u8>,
    },
    AttributeRaw {
        index: u8,
        partition: u8,
    },
}

impl fmt::Display for VideoType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VideoType::GeometryD(map) => write!(f, "GeometryD{}", map),
            VideoType::Attribute {
                index,
                partition,
                map: Some(map),
            } => write!(f, "Attribute{}P{}T{}", index, partition, map),
            VideoType::Attribute {
                index,
                partition,
                map: None,
            } => write!(f, "Attribute{}P{}", index, partition),
            VideoType::AttributeRaw { index, partition } => {
                write!(f, "AttributeRaw{}P{}", index, partition)
            }
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Codec group of a video sub-bitstream (`*_codec_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum CodecId {
    H264 = 0,
    #[num_enum(alternatives = [2])]
    H265 = 1,
    H266 = 3,
}

impl CodecId {
    pub fn from_codec_id(codec_id: u8) -> Result<CodecId> {
        CodecId::try_from(codec_id).map_err(|_| Error::Unsupported("video codec id"))
    }
}

/// One coded video sub-bitstream, in sample stream format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoBitstream {
    pub video_type: VideoType,
    pub data: Vec<u8>,
}

impl VideoBitstream {
    pub fn new(video_type: VideoType, data: Vec<u8>) -> Self {
        debug!("VideoType={} size={}", video_type, data.len());
        Self { video_type, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Rewrites length-prefixed NAL units (`precision` bytes of size each) as an
    /// Annex B byte stream, the only format video decoders accept.
    pub fn sample_stream_to_bytestream(&self, codec_id: CodecId, precision: usize) -> Result<Vec<u8>> {
        let data = &self.data;
        let mut result = Vec::with_capacity(data.len());
        let mut start = 0;
        let mut size_start_code = 4;

        while start + precision <= data.len() {
            let nalu_size = data[start..start + precision]
                .iter()
                .fold(0usize, |size, &b| (size << 8) | b as usize);
            let payload = start + precision;
            let end = payload + nalu_size;
            if end > data.len() {
                return Err(Error::VideoDecoder(format!(
                    "{}: nal unit of {} bytes truncated at {}",
                    self.video_type,
                    nalu_size,
                    data.len()
                )));
            }
            result.extend(std::iter::repeat(0).take(size_start_code - 1));
            result.push(1);
            result.extend_from_slice(&data[payload..end]);

            // a non-IRAP slice closes its access unit
            let new_frame = match codec_id {
                CodecId::H264 => true,
                CodecId::H265 => data[payload..end].first().map_or(true, |h| (h & 0x7e) >> 1 < 12),
                CodecId::H266 => data[payload..end].get(1).map_or(true, |h| (h & 0xf8) >> 3 < 12),
            };

            start = end;
            // start code of the next unit, from its header
            if start + precision + 1 < data.len() {
                let header = &data[start + precision..];
                let use_long_start_code = match codec_id {
                    CodecId::H264 => true,
                    CodecId::H265 => new_frame || (32..41).contains(&((header[0] & 0x7e) >> 1)),
                    CodecId::H266 => new_frame || (12..20).contains(&((header[1] & 0xf8) >> 3)),
                };
                size_start_code = if use_long_start_code { 4 } else { 3 };
            }
        }

        Ok(result)
    }
}

/// Sample type of a decoded plane.
pub trait Pixel: Copy + Default + PartialOrd + Send + 'static {
    const BYTES: usize;

    fn from_u32(value: u32) -> Self;
    fn to_u32(self) -> u32;

    /// Reads one sample from little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

impl Pixel for u8 {
    const BYTES: usize = 1;

    #[inline]
    fn from_u32(value: u32) -> Self {
        value.min(u8::MAX as u32) as u8
    }

    #[inline]
    fn to_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Pixel for u16 {
    const BYTES: usize = 2;

    #[inline]
    fn from_u32(value: u32) -> Self {
        value.min(u16::MAX as u32) as u16
    }

    #[inline]
    fn to_u32(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

/// A planar image; chroma planes may be subsampled.
#[derive(Debug, Default, Clone)]
pub struct Image<T> {
    pub width: u32,
    pub height: u32,
    pub channels: [Vec<T>; 3],
    pub format: ColorFormat,
}

impl<T: Pixel> Image<T> {
    pub fn new(width: u32, height: u32, format: ColorFormat) -> Self {
        let luma = (width * height) as usize;
        let chroma = match format {
            ColorFormat::Yuv420 => ((width / 2) * (height / 2)) as usize,
            _ => luma,
        };
        Self {
            width,
            height,
            channels: [vec![T::default(); luma], vec![T::default(); chroma], vec![T::default(); chroma]],
            format,
        }
    }

    /// Sample at (x, y) of `channel`, in that channel's resolution.
    #[inline]
    pub fn value(&self, channel: usize, x: usize, y: usize) -> T {
        let stride = self.channel_width(channel);
        self.channels[channel][y * stride + x]
    }

    #[inline]
    pub fn set_value(&mut self, channel: usize, x: usize, y: usize, value: T) {
        let stride = self.channel_width(channel);
        self.channels[channel][y * stride + x] = value;
    }

    #[inline]
    fn channel_width(&self, channel: usize) -> usize {
        if channel > 0 && self.format == ColorFormat::Yuv420 {
            (self.width / 2) as usize
        } else {
            self.width as usize
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Video<T> {
    pub frames: Vec<Image<T>>,
}

impl<T: Pixel> Video<T> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.frames.first().map_or(0, |f| f.width)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.frames.first().map_or(0, |f| f.height)
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn color_format(&self) -> ColorFormat {
        self.frames.first().map_or(ColorFormat::Unknown, |f| f.format)
    }

    /// Converts decoded samples from `input` to `output` bits. MSB aligned streams
    /// are shifted; LSB aligned ones are clipped to the output range.
    pub fn convert_bitdepth(&mut self, input: u8, output: u8, msb_align: bool) {
        if input == output {
            return;
        }
        let max_value = (1u32 << output) - 1;
        let convert = |v: u32| -> u32 {
            if msb_align {
                if input < output {
                    v << (output - input)
                } else {
                    v >> (input - output)
                }
            } else {
                v.min(max_value)
            }
        };
        for image in self.frames.iter_mut() {
            for channel in image.channels.iter_mut() {
                for sample in channel.iter_mut() {
                    *sample = T::from_u32(convert(sample.to_u32()));
                }
            }
        }
    }
}

pub struct VideoDecoderOptions {
    pub codec_id: CodecId,
    /// The sub-bitstream must be converted to a byte stream first.
    pub bytestream_video_coder: bool,
    pub output_bitdepth: u8,
    /// Keeps the byte stream handed to the decoder at this path.
    pub intermediate_path: Option<PathBuf>,
}

/// An external video decoder, e.g. ffmpeg, HM or VTM.
pub trait VideoDecoder {
    /// Does the heavylifting of calling the external video decoder and returns the decoded video.
    fn decode<T: Pixel>(&mut self, data: &[u8], codec_id: CodecId) -> Result<Video<T>>;

    fn decompress<T: Pixel>(
        &mut self,
        bitstream: &VideoBitstream,
        opts: &VideoDecoderOptions,
    ) -> Result<Video<T>> {
        let converted;
        let data = if opts.bytestream_video_coder {
            converted = bitstream.sample_stream_to_bytestream(opts.codec_id, 4)?;
            &converted[..]
        } else {
            &bitstream.data[..]
        };
        if let Some(path) = &opts.intermediate_path {
            std::fs::write(path, data)?;
        }

        let video = self.decode::<T>(data, opts.codec_id)?;
        debug!(
            "decoded {} video = {}x{} ({} frames) bitdepth={} color={:?}",
            bitstream.video_type,
            video.width(),
            video.height(),
            video.frame_count(),
            opts.output_bitdepth,
            video.color_format()
        );
        Ok(video)
    }
}

#[cfg(feature = "libavcodec")]
pub use self::libavcodec::LibavcodecDecoder;

#[cfg(feature = "libavcodec")]
mod libavcodec {
    extern crate ffmpeg_next as ffmpeg;

    use std::io::Write;

    use ffmpeg::{codec, decoder, format, frame};
    use tempfile::NamedTempFile;

    use super::{CodecId, Image, Pixel, Video, VideoDecoder};
    use crate::common::ColorFormat;
    use crate::error::{Error, Result};

    fn ffmpeg_error(e: ffmpeg::Error) -> Error {
        Error::VideoDecoder(e.to_string())
    }

    /// Copies one plane, dropping the row padding.
    fn read_plane<T: Pixel>(data: &[u8], stride: usize, width: usize, height: usize) -> Vec<T> {
        let mut plane = Vec::with_capacity(width * height);
        for row in data.chunks(stride).take(height) {
            plane.extend(
                row.chunks_exact(T::BYTES)
                    .take(width)
                    .map(T::from_le_slice),
            );
        }
        plane
    }

    #[derive(Debug, Default)]
    pub struct LibavcodecDecoder;

    impl VideoDecoder for LibavcodecDecoder {
        fn decode<T: Pixel>(&mut self, data: &[u8], codec_id: CodecId) -> Result<Video<T>> {
            ffmpeg::init().map_err(ffmpeg_error)?;

            // The tmpfile is deleted when it goes out of scope
            let mut tmpfile = NamedTempFile::new()?;
            tmpfile.write_all(data)?;
            let mut ictx = format::input(&tmpfile.path()).map_err(ffmpeg_error)?;

            let codec = match codec_id {
                CodecId::H264 => codec::Id::H264,
                CodecId::H265 => codec::Id::HEVC,
                CodecId::H266 => return Err(Error::Unsupported("H.266 through libavcodec")),
            };
            let mut decoder = decoder::new()
                .open_as(decoder::find(codec))
                .and_then(|o| o.video())
                .map_err(ffmpeg_error)?;

            let mut video = Video::<T>::default();
            let mut receive = |decoder: &mut decoder::Video| {
                let mut frame = frame::Video::empty();
                while decoder.receive_frame(&mut frame).is_ok() {
                    let planes = [0, 1, 2].map(|i| {
                        read_plane::<T>(
                            frame.data(i),
                            frame.stride(i),
                            frame.plane_width(i) as usize,
                            frame.plane_height(i) as usize,
                        )
                    });
                    let format = if frame.plane_width(1) == frame.width() {
                        ColorFormat::Yuv444
                    } else {
                        ColorFormat::Yuv420
                    };
                    video.frames.push(Image {
                        width: frame.width(),
                        height: frame.height(),
                        channels: planes,
                        format,
                    });
                }
            };

            for (_stream, packet) in ictx.packets() {
                decoder.send_packet(&packet).map_err(ffmpeg_error)?;
                receive(&mut decoder);
            }
            decoder.send_eof().map_err(ffmpeg_error)?;
            receive(&mut decoder);

            tmpfile.close()?;
            Ok(video)
        }
    }
}
