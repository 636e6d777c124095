/// 画面座標の矩形（左上原点、y下向き）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// 中心とサイズから作る（奇数サイズは左上寄り）
    pub fn from_center(center: (i32, i32), size: (u32, u32)) -> Self {
        Self {
            x: center.0 - (size.0 / 2) as i32,
            y: center.1 - (size.1 / 2) as i32,
            width: size.0,
            height: size.1,
        }
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + (self.width / 2) as i32, self.y + (self.height / 2) as i32)
    }

    /// 右端・下端は含まない
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.left() && px < self.right() && py >= self.top() && py < self.bottom()
    }

    /// 円との当たり判定（最近接点までの距離）
    pub fn intersects_circle(&self, cx: f32, cy: f32, radius: f32) -> bool {
        let closest_x = cx.clamp(self.left() as f32, self.right() as f32);
        let closest_y = cy.clamp(self.top() as f32, self.bottom() as f32);
        let dx = cx - closest_x;
        let dy = cy - closest_y;
        dx * dx + dy * dy < radius * radius
    }
}

/// w×h の矩形を angle_deg 回転させたときの外接サイズ
pub fn rotated_extent(size: (u32, u32), angle_deg: f32) -> (u32, u32) {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let w = size.0 as f32;
    let h = size.1 as f32;
    let bw = (w * cos).abs() + (h * sin).abs();
    let bh = (w * sin).abs() + (h * cos).abs();
    // 浮動小数の誤差で1ピクセル膨らまないよう丸めてから切り上げ
    let snap = |v: f32| ((v * 1000.0).round() / 1000.0).ceil().max(1.0) as u32;
    (snap(bw), snap(bh))
}
