use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// ループの上限周期（描画リフレッシュ相当）
    #[serde(default = "default_display_fps")]
    pub display_fps: f32,
    /// フレーム送信用JPEG品質
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: i32,
    /// デバイス列挙で試すインデックス数
    #[serde(default = "default_probe_limit")]
    pub probe_limit: i32,
}

fn default_display_fps() -> f32 { 60.0 }
fn default_jpeg_quality() -> i32 { 80 }
fn default_probe_limit() -> i32 { 8 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            display_fps: default_display_fps(),
            jpeg_quality: default_jpeg_quality(),
            probe_limit: default_probe_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    /// 足首キーポイントの信頼度ゲート。これを超えた観測のみ採用する
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// EMAの前回値に掛かる重み (0.0〜1.0)
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f32,
}

fn default_min_score() -> f32 { 0.6 }
fn default_smoothing_alpha() -> f32 { 0.5 }

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            smoothing_alpha: default_smoothing_alpha(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// MoveNet ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込みに失敗した場合はデフォルト設定で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "[config] {}: {e:#}, using defaults",
                    path.as_ref().display()
                );
                Self::default()
            }
        }
    }
}
