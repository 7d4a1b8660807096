/// 列挙されたキャプチャデバイス
///
/// IDは不透明な文字列。一覧は登録のたびに取り直されるが、
/// 個々のエントリは不変として扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDevice {
    pub device_id: String,
    pub label: String,
}

impl CaptureDevice {
    pub fn new(device_id: &str, label: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            label: label.to_string(),
        }
    }

    /// 表示用ラベル。空の場合は "Camera <IDの先頭4文字>" にフォールバック
    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            let head: String = self.device_id.chars().take(4).collect();
            format!("Camera {}", head)
        } else {
            self.label.clone()
        }
    }
}

/// 接続中のカメラをインデックス順に列挙する
///
/// OpenCVはデバイス名を返さないのでラベルは空のまま。
/// 開けないインデックスに当たった時点で打ち切る。
#[cfg(feature = "desktop")]
pub fn enumerate_devices(probe_limit: i32) -> Vec<CaptureDevice> {
    use opencv::videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst};

    let mut devices = Vec::new();
    for index in 0..probe_limit {
        let Ok(mut capture) = VideoCapture::new(index, videoio::CAP_ANY) else {
            break;
        };
        if !capture.is_opened().unwrap_or(false) {
            break;
        }
        devices.push(CaptureDevice::new(&index.to_string(), ""));
        let _ = capture.release();
    }
    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_passthrough() {
        let device = CaptureDevice::new("0", "Logitech C920");
        assert_eq!(device.display_label(), "Logitech C920");
    }

    #[test]
    fn test_display_label_fallback() {
        let device = CaptureDevice::new("abcdef123", "");
        assert_eq!(device.display_label(), "Camera abcd");
    }

    #[test]
    fn test_display_label_fallback_short_id() {
        // IDが4文字未満でもpanicしない
        let device = CaptureDevice::new("7", "");
        assert_eq!(device.display_label(), "Camera 7");
    }
}
