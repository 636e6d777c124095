use anyhow::{anyhow, Context, Result};
use rosc::{decoder, encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

use super::builder::Rig;
use crate::geometry::Rect;

/// 頭の当たり判定矩形を保持する
///
/// 頭が置かれたフレームで上書きし、置けなかったフレームでは前の値を残す。
/// 一度も置かれていなければ None。
#[derive(Debug, Default, Clone)]
pub struct HitboxTracker {
    current: Option<Rect>,
}

impl HitboxTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 主人物のリグで更新。頭がなければ何もしない
    pub fn update(&mut self, rig: &Rig) {
        if let Some(bounds) = rig.head_bounds() {
            self.current = Some(bounds);
        }
    }

    pub fn current(&self) -> Option<Rect> {
        self.current
    }
}

/// 引数: enable, x, y, w, h（enable=0 なら矩形なし）
pub fn build_hitbox_message(address: &str, hitbox: Option<Rect>) -> OscMessage {
    let (enable, rect) = match hitbox {
        Some(r) => (1, r),
        None => (0, Rect::new(0, 0, 0, 0)),
    };
    OscMessage {
        addr: address.to_string(),
        args: vec![
            OscType::Int(enable),
            OscType::Int(rect.x),
            OscType::Int(rect.y),
            OscType::Int(rect.width as i32),
            OscType::Int(rect.height as i32),
        ],
    }
}

/// `build_hitbox_message` の逆。形式が違えば None
pub fn parse_hitbox_message(msg: &OscMessage) -> Option<Option<Rect>> {
    let ints: Vec<i32> = msg
        .args
        .iter()
        .map(|a| match a {
            OscType::Int(v) => Some(*v),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    match ints.as_slice() {
        [0, ..] if ints.len() == 5 => Some(None),
        [_, x, y, w, h] => Some(Some(Rect::new(*x, *y, (*w).max(0) as u32, (*h).max(0) as u32))),
        _ => None,
    }
}

pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// UDPで受けたバイト列からメッセージを取り出す（バンドルは展開する）
pub fn decode_osc_messages(data: &[u8]) -> Result<Vec<OscMessage>> {
    let (_, packet) = decoder::decode_udp(data).map_err(|e| anyhow!("Invalid OSC packet: {:?}", e))?;
    let mut messages = Vec::new();
    collect_messages(packet, &mut messages);
    Ok(messages)
}

fn collect_messages(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for p in bundle.content {
                collect_messages(p, out);
            }
        }
    }
}

/// 当たり判定をOSCでゲーム側へ送る
pub struct OscHitboxSender {
    socket: UdpSocket,
    target_addr: String,
    address: String,
}

impl OscHitboxSender {
    pub fn new(target_addr: &str, address: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("Failed to bind UDP socket")?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
            address: address.to_string(),
        })
    }

    pub fn send(&self, hitbox: Option<Rect>) -> Result<()> {
        let msg = build_hitbox_message(&self.address, hitbox);
        let data = encode_osc_message(&msg)?;
        self.socket
            .send_to(&data, &self.target_addr)
            .with_context(|| format!("Failed to send hitbox to {}", self.target_addr))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::builder::PlacedBone;
    use crate::rig::Bone;
    use std::time::Duration;

    fn rig_with_head(bounds: Option<Rect>) -> Rig {
        Rig {
            bones: bounds
                .map(|b| PlacedBone {
                    bone: Bone::Head,
                    center: (0.0, 0.0),
                    size: (b.width, b.height),
                    rotation_deg: 0.0,
                    bounds: b,
                })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn test_absent_until_first_head() {
        let mut tracker = HitboxTracker::new();
        tracker.update(&rig_with_head(None));
        assert_eq!(tracker.current(), None);
    }

    #[test]
    fn test_stale_when_head_missing() {
        let mut tracker = HitboxTracker::new();
        let first = Rect::new(10, 20, 30, 40);
        tracker.update(&rig_with_head(Some(first)));
        tracker.update(&rig_with_head(None));
        assert_eq!(tracker.current(), Some(first));

        let second = Rect::new(11, 21, 30, 40);
        tracker.update(&rig_with_head(Some(second)));
        assert_eq!(tracker.current(), Some(second));
    }

    #[test]
    fn test_build_hitbox_message_args() {
        let msg = build_hitbox_message("/Rig/Hitbox", Some(Rect::new(-5, 20, 30, 40)));
        assert_eq!(msg.addr, "/Rig/Hitbox");
        assert_eq!(
            msg.args,
            vec![
                OscType::Int(1),
                OscType::Int(-5),
                OscType::Int(20),
                OscType::Int(30),
                OscType::Int(40)
            ]
        );
        let none = build_hitbox_message("/Rig/Hitbox", None);
        assert_eq!(none.args[0], OscType::Int(0));
    }

    #[test]
    fn test_parse_hitbox_message() {
        let rect = Rect::new(1, 2, 3, 4);
        let msg = build_hitbox_message("/Rig/Hitbox", Some(rect));
        assert_eq!(parse_hitbox_message(&msg), Some(Some(rect)));
        assert_eq!(parse_hitbox_message(&build_hitbox_message("/x", None)), Some(None));

        let bad = OscMessage {
            addr: "/Rig/Hitbox".to_string(),
            args: vec![OscType::Float(1.0)],
        };
        assert_eq!(parse_hitbox_message(&bad), None);
    }

    #[test]
    fn test_sender_reaches_udp_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let target = listener.local_addr().unwrap().to_string();

        let sender = OscHitboxSender::new(&target, "/Rig/Hitbox").unwrap();
        let rect = Rect::new(100, 50, 135, 135);
        sender.send(Some(rect)).unwrap();

        let mut buf = [0u8; 512];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        let messages = decode_osc_messages(&buf[..n]).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(parse_hitbox_message(&messages[0]), Some(Some(rect)));
    }
}
