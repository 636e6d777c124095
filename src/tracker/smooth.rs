use crate::config::SmoothConfig;
use crate::pose::{KeypointIndex, Pose};

const N: usize = KeypointIndex::COUNT;

/// 17点のEMA平滑化フィルタ
///
/// 検出点（信頼度 >= threshold）: 成分ごとのEMA
/// 未検出点: 検出点の平均移動量だけ前フレームの位置から平行移動
pub struct KeypointSmoother {
    alpha: f32,
    threshold: f32,
    prev: Option<[[f32; 2]; N]>,
}

impl KeypointSmoother {
    pub fn new(alpha: f32, threshold: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            threshold,
            prev: None,
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.alpha, config.confidence_threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 平滑化後の姿勢を返す。信頼度は入力のまま
    pub fn apply(&mut self, raw: &Pose) -> Pose {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                let mut seed = [[0.0; 2]; N];
                for (s, kp) in seed.iter_mut().zip(raw.keypoints.iter()) {
                    *s = [kp.x, kp.y];
                }
                self.prev = Some(seed);
                return raw.clone();
            }
        };

        let a = self.alpha;
        let mut next = prev;
        let mut detected = [false; N];
        let mut delta = [0.0f32; 2];
        let mut count = 0usize;

        for (i, kp) in raw.keypoints.iter().enumerate() {
            if !kp.is_detected(self.threshold) {
                continue;
            }
            next[i] = [
                a * kp.x + (1.0 - a) * prev[i][0],
                a * kp.y + (1.0 - a) * prev[i][1],
            ];
            detected[i] = true;
            delta[0] += next[i][0] - prev[i][0];
            delta[1] += next[i][1] - prev[i][1];
            count += 1;
        }

        // 遮蔽点は体全体の動きに追従させる
        if count > 0 {
            let avg = [delta[0] / count as f32, delta[1] / count as f32];
            for i in 0..N {
                if !detected[i] {
                    next[i] = [prev[i][0] + avg[0], prev[i][1] + avg[1]];
                }
            }
        }

        self.prev = Some(next);

        let mut pose = raw.clone();
        for (kp, p) in pose.keypoints.iter_mut().zip(next.iter()) {
            kp.x = p[0];
            kp.y = p[1];
        }
        pose
    }
}
