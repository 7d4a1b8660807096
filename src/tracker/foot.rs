use crate::pose::{Keypoint, KeypointIndex, Pose};

use super::smooth::PointSmoother;

/// 左右の足首キーポイントから信頼度の高い方を選ぶ
///
/// 欠損キーポイントはスコア0として扱う。左は厳密に上回る場合のみ、
/// 同点は右を返す。
pub fn select_ankle(left: Option<&Keypoint>, right: Option<&Keypoint>) -> Keypoint {
    let left = left.copied().unwrap_or_default();
    let right = right.copied().unwrap_or_default();
    if left.confidence > right.confidence {
        left
    } else {
        right
    }
}

/// 足首追跡: 選択 → 信頼度ゲート → EMA平滑化
///
/// 平滑化状態はデバイス切替では消えない（プロセス再起動まで持続）。
pub struct FootTracker {
    min_score: f32,
    smoother: PointSmoother,
}

impl FootTracker {
    pub fn new(min_score: f32, smoothing_alpha: f32) -> Self {
        Self {
            min_score,
            smoother: PointSmoother::new(smoothing_alpha),
        }
    }

    /// 観測が受理された場合のみ平滑化済みピクセル座標を返す。
    /// 閾値以下の観測はフィルタを更新せず、そのティックの出力もない。
    pub fn update(&mut self, pose: &Pose) -> Option<(f32, f32)> {
        let ankle = select_ankle(
            Some(pose.get(KeypointIndex::LeftAnkle)),
            Some(pose.get(KeypointIndex::RightAnkle)),
        );
        if ankle.confidence <= self.min_score {
            return None;
        }
        Some(self.smoother.apply(ankle.x, ankle.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_with_ankles(left: (f32, f32, f32), right: (f32, f32, f32)) -> Pose {
        let mut pose = Pose::default();
        pose.keypoints[KeypointIndex::LeftAnkle as usize] =
            Keypoint::new(left.0, left.1, left.2);
        pose.keypoints[KeypointIndex::RightAnkle as usize] =
            Keypoint::new(right.0, right.1, right.2);
        pose
    }

    #[test]
    fn test_select_higher_confidence() {
        let left = Keypoint::new(1.0, 2.0, 0.8);
        let right = Keypoint::new(3.0, 4.0, 0.3);
        assert_eq!(select_ankle(Some(&left), Some(&right)), left);
        assert_eq!(select_ankle(Some(&right), Some(&left)), left);
    }

    #[test]
    fn test_select_tie_prefers_right() {
        let left = Keypoint::new(1.0, 2.0, 0.5);
        let right = Keypoint::new(3.0, 4.0, 0.5);
        assert_eq!(select_ankle(Some(&left), Some(&right)), right);
    }

    #[test]
    fn test_select_missing_counts_as_zero() {
        let left = Keypoint::new(1.0, 2.0, 0.1);
        assert_eq!(select_ankle(Some(&left), None), left);
        assert_eq!(select_ankle(None, None), Keypoint::default());
    }

    #[test]
    fn test_gate_rejects_at_threshold() {
        // score <= min_score は棄却（厳密に超える必要がある）
        let mut tracker = FootTracker::new(0.6, 0.5);
        let pose = pose_with_ankles((10.0, 10.0, 0.6), (0.0, 0.0, 0.1));
        assert_eq!(tracker.update(&pose), None);
    }

    #[test]
    fn test_gate_accepts_above_threshold() {
        // 左0.8 / 右0.3 / 閾値0.2 → 左足首が受理される
        let mut tracker = FootTracker::new(0.2, 0.5);
        let pose = pose_with_ankles((100.0, 200.0, 0.8), (50.0, 60.0, 0.3));
        assert_eq!(tracker.update(&pose), Some((100.0, 200.0)));
    }

    #[test]
    fn test_rejected_observation_does_not_update_filter() {
        let mut tracker = FootTracker::new(0.5, 0.5);
        assert_eq!(
            tracker.update(&pose_with_ankles((10.0, 10.0, 0.9), (0.0, 0.0, 0.0))),
            Some((10.0, 10.0))
        );
        // 閾値以下 → 出力なし、状態も動かない
        assert_eq!(
            tracker.update(&pose_with_ankles((100.0, 100.0, 0.4), (0.0, 0.0, 0.0))),
            None
        );
        // 次の受理観測は棄却前の状態から平滑化される
        let (x, y) = tracker.update(&pose_with_ankles((20.0, 30.0, 0.9), (0.0, 0.0, 0.0))).unwrap();
        assert!((x - 15.0).abs() < 1e-6);
        assert!((y - 20.0).abs() < 1e-6);
    }
}
