/// 追跡点のEMA平滑化フィルタ（成分ごと）
///
/// alpha は前回値に掛かる重み: p = alpha * p_prev + (1 - alpha) * o
/// 初回の観測はそのまま通す。状態はプロセス終了までリセットされない。
pub struct PointSmoother {
    alpha: f32,
    prev: Option<(f32, f32)>,
}

impl PointSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, prev: None }
    }

    pub fn apply(&mut self, x: f32, y: f32) -> (f32, f32) {
        let (px, py) = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some((x, y));
                return (x, y);
            }
        };

        let a = self.alpha;
        let smoothed = (a * px + (1.0 - a) * x, a * py + (1.0 - a) * y);
        self.prev = Some(smoothed);
        smoothed
    }
}
