use anyhow::{Context, Result};
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use mocap_puppet::config::Config;
use mocap_puppet::rig::hitbox::{decode_osc_messages, parse_hitbox_message};

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_LISTEN: &str = "127.0.0.1:39571";

/// ゲーム側の代わりに当たり判定のOSCを受けて表示する
fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let listen = std::env::args()
        .nth(1)
        .or_else(|| config.hitbox.osc_target.clone())
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());

    let socket = UdpSocket::bind(&listen).with_context(|| format!("Failed to bind {}", listen))?;
    socket.set_read_timeout(Some(Duration::from_secs(1)))?;
    println!("Hitbox Monitor ({})", env!("GIT_VERSION"));
    println!("Listening on {} for {}", listen, config.hitbox.osc_address);

    let mut buf = [0u8; 1536];
    let mut count = 0u32;
    let mut timer = Instant::now();
    let mut last = None;

    loop {
        match socket.recv_from(&mut buf) {
            Ok((n, _)) => match decode_osc_messages(&buf[..n]) {
                Ok(messages) => {
                    for msg in messages.iter().filter(|m| m.addr == config.hitbox.osc_address) {
                        match parse_hitbox_message(msg) {
                            Some(hitbox) => {
                                count += 1;
                                if hitbox != last {
                                    match hitbox {
                                        Some(r) => println!("hitbox ({}, {}) {}x{}", r.x, r.y, r.width, r.height),
                                        None => println!("hitbox none"),
                                    }
                                    last = hitbox;
                                }
                            }
                            None => eprintln!("Unexpected args: {:?}", msg.args),
                        }
                    }
                }
                Err(e) => eprintln!("{:#}", e),
            },
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e).context("recv failed"),
        }

        if timer.elapsed() >= Duration::from_secs(1) {
            println!("rate: {} msg/s", count);
            count = 0;
            timer = Instant::now();
        }
    }
}
