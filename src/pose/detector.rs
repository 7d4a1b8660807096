use anyhow::Result;
use async_trait::async_trait;

use crate::camera::Snapshot;

use super::keypoint::Pose;

/// 姿勢推定バックエンドの差し替え可能なインターフェース
///
/// 単一被写体モデルを想定し、1回の推定で高々1つの姿勢を返す。
#[async_trait]
pub trait Detector: Send {
    /// 冪等。初回呼び出しでバックエンドとモデルを読み込み、以降は何もしない
    async fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// スナップショットから姿勢を推定する（0件または1件）。
    /// エラー時はそのティックをスキップし、ループは継続する。
    async fn estimate(&mut self, snapshot: &Snapshot) -> Result<Option<Pose>>;
}

#[cfg(feature = "desktop")]
pub use desktop::MoveNetDetector;

#[cfg(feature = "desktop")]
mod desktop {
    use std::path::{Path, PathBuf};

    use anyhow::{bail, Context, Result};
    use async_trait::async_trait;
    use ndarray::Array4;
    use opencv::{
        core::{AlgorithmHint, Mat, Size, CV_32FC3},
        imgproc,
        prelude::*,
    };
    use ort::session::builder::GraphOptimizationLevel;
    use ort::session::Session;
    use ort::value::Tensor;

    use crate::camera::Snapshot;
    use crate::pose::keypoint::{Keypoint, KeypointIndex, Pose};

    use super::Detector;

    /// MoveNet用の入力サイズ
    const INPUT_SIZE: i32 = 192;

    /// MoveNet (SinglePose Lightning, ONNX) による姿勢検出器
    ///
    /// セッションは初回のinitializeで遅延構築し、デバイス切替をまたいで
    /// 使い回す。
    pub struct MoveNetDetector {
        model_path: PathBuf,
        session: Option<Session>,
    }

    impl MoveNetDetector {
        pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
            Self {
                model_path: model_path.as_ref().to_path_buf(),
                session: None,
            }
        }
    }

    #[async_trait]
    impl Detector for MoveNetDetector {
        async fn initialize(&mut self) -> Result<()> {
            if self.session.is_some() {
                return Ok(());
            }
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .commit_from_file(&self.model_path)
                .with_context(|| {
                    format!("failed to load ONNX model {}", self.model_path.display())
                })?;
            self.session = Some(session);
            eprintln!("[pose] MoveNet model loaded");
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            self.session.is_some()
        }

        async fn estimate(&mut self, snapshot: &Snapshot) -> Result<Option<Pose>> {
            let Some(session) = self.session.as_mut() else {
                bail!("detector is not initialized");
            };

            let input = movenet_input(snapshot)?;
            let input_tensor = Tensor::from_array(input)?;
            let outputs = session
                .run(ort::inputs!["serving_default_input_0" => input_tensor])
                .context("inference failed")?;

            // 出力は [1, 1, 17, 3] (y, x, score)。正規化座標なので
            // スナップショット寸法でピクセル座標に戻す
            let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
                .try_extract_array()
                .context("failed to extract output tensor")?;

            let (width, height) = snapshot.dimensions();
            let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
            for (i, keypoint) in keypoints.iter_mut().enumerate() {
                let y = output[[0, 0, i, 0]];
                let x = output[[0, 0, i, 1]];
                let confidence = output[[0, 0, i, 2]];
                *keypoint = Keypoint::new(x * width as f32, y * height as f32, confidence);
            }

            Ok(Some(Pose::new(keypoints)))
        }
    }

    /// スナップショットのMatをMoveNet入力 [1,192,192,3] (f32, 0-255) に変換
    fn movenet_input(snapshot: &Snapshot) -> Result<Array4<f32>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(
            &snapshot.mat,
            &mut rgb,
            imgproc::COLOR_BGR2RGB,
            0,
            AlgorithmHint::ALGO_HINT_DEFAULT,
        )?;

        let mut resized = Mat::default();
        imgproc::resize(
            &rgb,
            &mut resized,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut float_mat = Mat::default();
        resized.convert_to(&mut float_mat, CV_32FC3, 1.0, 0.0)?;

        let mut tensor =
            Array4::<f32>::zeros((1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3));
        for y in 0..INPUT_SIZE {
            for x in 0..INPUT_SIZE {
                let pixel = float_mat.at_2d::<opencv::core::Vec3f>(y, x)?;
                for c in 0..3 {
                    tensor[[0, y as usize, x as usize, c]] = pixel[c];
                }
            }
        }

        Ok(tensor)
    }
}
