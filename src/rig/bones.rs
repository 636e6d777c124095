use crate::pose::KeypointIndex;

/// リグを構成する部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bone {
    Head,
    Torso,
    LeftBicep,
    RightBicep,
    LeftForearm,
    RightForearm,
    LeftThigh,
    RightThigh,
    LeftShin,
    RightShin,
}

/// 部位に割り当てるスプライト画像
///
/// 手足のスプライトは横向きに描く。画像の幅（x方向）が骨の長さ方向で、
/// 縦長の画像でも幅が骨の長さに合わせられる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKind {
    Head,
    Torso,
    Bicep,
    Forearm,
    Thigh,
    Shin,
}

impl SpriteKind {
    pub const COUNT: usize = 6;

    pub const ALL: [SpriteKind; Self::COUNT] = [
        SpriteKind::Head,
        SpriteKind::Torso,
        SpriteKind::Bicep,
        SpriteKind::Forearm,
        SpriteKind::Thigh,
        SpriteKind::Shin,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            SpriteKind::Head => "head.png",
            SpriteKind::Torso => "torso.png",
            SpriteKind::Bicep => "bicep.png",
            SpriteKind::Forearm => "arm.png",
            SpriteKind::Thigh => "thigh.png",
            SpriteKind::Shin => "shin.png",
        }
    }

    /// ファイルがないときの代替スプライトのサイズ
    pub fn placeholder_size(&self) -> (u32, u32) {
        match self {
            SpriteKind::Head => (100, 100),
            SpriteKind::Torso => (100, 150),
            _ => (100, 30),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl Bone {
    pub fn sprite(&self) -> SpriteKind {
        match self {
            Bone::Head => SpriteKind::Head,
            Bone::Torso => SpriteKind::Torso,
            Bone::LeftBicep | Bone::RightBicep => SpriteKind::Bicep,
            Bone::LeftForearm | Bone::RightForearm => SpriteKind::Forearm,
            Bone::LeftThigh | Bone::RightThigh => SpriteKind::Thigh,
            Bone::LeftShin | Bone::RightShin => SpriteKind::Shin,
        }
    }
}

/// 2点間に張る手足: (部位, 始点, 終点)。描画順
pub const LIMB_SEGMENTS: [(Bone, KeypointIndex, KeypointIndex); 8] = [
    (Bone::LeftForearm, KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (Bone::RightForearm, KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    (Bone::LeftBicep, KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (Bone::RightBicep, KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (Bone::LeftThigh, KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (Bone::RightThigh, KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (Bone::LeftShin, KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (Bone::RightShin, KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// スプライト種別ごとの元画像サイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteSizes {
    sizes: [(u32, u32); SpriteKind::COUNT],
}

impl Default for SpriteSizes {
    /// 代替スプライトのサイズ
    fn default() -> Self {
        let mut sizes = [(1, 1); SpriteKind::COUNT];
        for kind in SpriteKind::ALL {
            sizes[kind.index()] = kind.placeholder_size();
        }
        Self { sizes }
    }
}

impl SpriteSizes {
    pub fn get(&self, kind: SpriteKind) -> (u32, u32) {
        self.sizes[kind.index()]
    }

    /// 0は1に丸める
    pub fn set(&mut self, kind: SpriteKind, size: (u32, u32)) {
        self.sizes[kind.index()] = (size.0.max(1), size.1.max(1));
    }
}
