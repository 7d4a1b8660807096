use anyhow::Result;

/// 最新のデコード済みフレームを保持するスナップショット
///
/// セッションごとに1つ確保され、毎ティック同じバッファに上書きされる。
/// 利用側は過去に見たSnapshotが最新のまま残っている保証を持たない。
/// 推論側へは `FrameSource::snapshot` で複製を渡す。
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    width: u32,
    height: u32,
    #[cfg(feature = "desktop")]
    pub(crate) mat: opencv::core::Mat,
}

impl Snapshot {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            #[cfg(feature = "desktop")]
            mat: opencv::core::Mat::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// キャプチャデバイスのライフサイクルと現在フレームの取得
pub trait FrameSource: Send {
    /// 既存ストリームを完全に解放してから deviceId のストリームを取得し、
    /// スナップショットをネイティブ解像度に合わせる。
    /// 失敗時は前セッションが解放されたまま、新セッションは確立されない。
    fn configure(&mut self, device_id: &str) -> Result<()>;

    /// 現在の映像をスナップショットバッファへ描き込む。
    /// フレームがまだ得られない場合は false（準備中はエラー扱いしない）。
    fn capture_snapshot(&mut self) -> Result<bool>;

    /// 推論用にスナップショットの複製を返す
    fn snapshot(&self) -> Snapshot;

    /// ソースのネイティブFPS（取得できる場合のみ）
    fn frame_rate(&self) -> Option<f32> {
        None
    }

    /// スナップショットをJPEGにエンコードし base64 データURLにする
    fn encode_frame(&self) -> Result<String>;
}

#[cfg(feature = "desktop")]
pub use desktop::OpenCvFrameSource;

#[cfg(feature = "desktop")]
mod desktop {
    use anyhow::{bail, Context, Result};
    use base64::Engine as _;
    use opencv::{
        core::{Mat, Vector},
        imgcodecs, imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };

    use super::{FrameSource, Snapshot};

    /// OpenCV VideoCapture を使ったフレームソース
    pub struct OpenCvFrameSource {
        capture: Option<VideoCapture>,
        snapshot: Snapshot,
        frame_rate: Option<f32>,
        jpeg_quality: i32,
    }

    impl OpenCvFrameSource {
        pub fn new(jpeg_quality: i32) -> Self {
            Self {
                capture: None,
                snapshot: Snapshot::new(0, 0),
                frame_rate: None,
                jpeg_quality,
            }
        }
    }

    impl FrameSource for OpenCvFrameSource {
        fn configure(&mut self, device_id: &str) -> Result<()> {
            // 2本のストリームを同時にライブにしない。先に必ず解放する
            if let Some(mut capture) = self.capture.take() {
                capture
                    .release()
                    .context("failed to release previous stream")?;
            }
            self.frame_rate = None;
            self.snapshot.set_dimensions(0, 0);

            let index: i32 = device_id
                .parse()
                .with_context(|| format!("invalid device id: {device_id}"))?;
            let mut capture = VideoCapture::new(index, videoio::CAP_ANY)
                .with_context(|| format!("failed to open camera {index}"))?;
            if !capture.is_opened()? {
                bail!("camera {index} is not available");
            }
            capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
            let fps = capture.get(videoio::CAP_PROP_FPS)?;

            self.snapshot.set_dimensions(width, height);
            self.frame_rate = (fps > 0.0).then_some(fps as f32);
            self.capture = Some(capture);
            eprintln!("[camera] device {index} opened ({width}x{height}, {fps:.0} fps)");
            Ok(())
        }

        fn capture_snapshot(&mut self) -> Result<bool> {
            let Some(capture) = self.capture.as_mut() else {
                return Ok(false);
            };
            if !capture
                .read(&mut self.snapshot.mat)
                .context("failed to read frame")?
            {
                return Ok(false);
            }
            if self.snapshot.mat.empty() {
                return Ok(false);
            }
            // ソース解像度が変わっていたら寸法を追従させる
            let width = self.snapshot.mat.cols() as u32;
            let height = self.snapshot.mat.rows() as u32;
            if (width, height) != self.snapshot.dimensions() {
                self.snapshot.set_dimensions(width, height);
            }
            Ok(true)
        }

        fn snapshot(&self) -> Snapshot {
            self.snapshot.clone()
        }

        fn frame_rate(&self) -> Option<f32> {
            self.frame_rate
        }

        fn encode_frame(&self) -> Result<String> {
            let params = Vector::from_iter([imgcodecs::IMWRITE_JPEG_QUALITY, self.jpeg_quality]);
            let mut buf: Vector<u8> = Vector::new();

            // imencode は BGR 8UC3 を想定。BGRAなら変換する
            let mat = if self.snapshot.mat.channels() == 4 {
                let mut bgr = Mat::default();
                imgproc::cvt_color_def(&self.snapshot.mat, &mut bgr, imgproc::COLOR_BGRA2BGR)?;
                bgr
            } else {
                self.snapshot.mat.clone()
            };

            imgcodecs::imencode(".jpg", &mat, &mut buf, &params)?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(buf.as_slice());
            Ok(format!("data:image/jpeg;base64,{encoded}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_dimensions() {
        let snapshot = Snapshot::new(640, 480);
        assert_eq!(snapshot.dimensions(), (640, 480));
        assert_eq!(snapshot.width(), 640);
        assert_eq!(snapshot.height(), 480);
    }

    #[test]
    fn test_snapshot_resize_in_place() {
        let mut snapshot = Snapshot::new(640, 480);
        snapshot.set_dimensions(1280, 720);
        assert_eq!(snapshot.dimensions(), (1280, 720));
    }
}
