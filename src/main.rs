use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mocap_puppet::calibration::{CalibrationParams, CalibrationState, CalibrationUi};
use mocap_puppet::config::Config;
use mocap_puppet::frame::FrameSlot;
use mocap_puppet::logging::{open_log_file, LogFile};
use mocap_puppet::pipeline::{FramePipeline, StepOutcome};
use mocap_puppet::pose::{InferenceWorker, YoloPoseSource};
use mocap_puppet::render::{rgb, Canvas, FrameBuffer, MinifbRenderer, SpriteSet, UiFont};
use mocap_puppet::rig::OscHitboxSender;
use mocap_puppet::{ingress, log};

const CONFIG_PATH: &str = "config.toml";
/// 背景画像がないときの塗りつぶし色
const BACKGROUND_COLOR: u32 = rgb(0, 255, 0);

struct FpsCounter {
    frame_count: u32,
    inference_count: u32,
    timeout_count: u32,
    timer: Instant,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frame_count: 0,
            inference_count: 0,
            timeout_count: 0,
            timer: Instant::now(),
        }
    }
}

fn load_background(path: &str, window: (u32, u32)) -> Result<RgbImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load background {}", path))?
        .to_rgb8();
    Ok(imageops::resize(&image, window.0, window.1, FilterType::Triangle))
}

/// キャリブレーション画面を回す。ウィンドウが閉じられたら None
fn run_calibration(
    renderer: &mut MinifbRenderer,
    fb: &mut FrameBuffer,
    slot: &FrameSlot,
    initial: CalibrationParams,
    font: Option<UiFont>,
    logfile: &LogFile,
) -> Result<Option<CalibrationParams>> {
    let mut ui = CalibrationUi::new(initial, renderer.size()).with_font(font);
    let mut last_title = String::new();

    let state = loop {
        for event in renderer.poll_pointer() {
            ui.handle(event);
        }
        if ui.state().is_done() {
            break ui.state();
        }

        let preview = slot.peek();
        ui.draw(fb, preview.as_ref());
        let title = ui.title();
        if title != last_title {
            renderer.set_title(&title);
            last_title = title;
        }
        renderer.present(fb)?;
    };

    match state {
        CalibrationState::Accepted(p) => log!(logfile, "Calibration accepted: {:?}", p),
        CalibrationState::Cancelled(p) => log!(logfile, "Calibration cancelled, using initial values: {:?}", p),
        CalibrationState::Editing => {}
    }

    if !renderer.window_open() {
        return Ok(None);
    }
    // 取消に使ったESCでゲームループまで抜けないよう離されるのを待つ
    while renderer.escape_down() && renderer.window_open() {
        renderer.present(fb)?;
    }
    Ok(state.params())
}

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);
    let logfile = open_log_file(&config.app.log_dir, "mocap")?;
    let window = (config.app.window_width, config.app.window_height);

    log!(logfile, "Mocap Puppet ({})", env!("GIT_VERSION"));
    log!(logfile, "Window: {}x{} (mirror: {})", window.0, window.1, config.app.mirror);
    log!(logfile, "Target FPS: {}", config.app.target_fps);
    log!(logfile, "Smoothing: alpha={} threshold={} max_subjects={}",
        config.smooth.alpha, config.smooth.confidence_threshold, config.smooth.max_subjects);

    let slot = Arc::new(FrameSlot::new());
    let (bound, _ingress) = ingress::spawn(&config.ingress.addr, slot.clone(), config.ingress.max_body_bytes)?;
    log!(logfile, "Ingress listening on http://{} (POST /upload)", bound);

    let sprites = SpriteSet::load(&config.rig.sprite_dir);
    for kind in sprites.missing() {
        log!(logfile, "WARNING: {}/{} not found, using placeholder", config.rig.sprite_dir, kind.file_name());
    }

    let background = match config.app.background.as_deref() {
        Some(path) => match load_background(path, window) {
            Ok(img) => Some(img),
            Err(e) => {
                log!(logfile, "WARNING: {:#}", e);
                None
            }
        },
        None => None,
    };

    let mut renderer = MinifbRenderer::new("Mocap Puppet", window.0 as usize, window.1 as usize)?;
    renderer.set_target_fps(config.app.target_fps);
    let mut fb = FrameBuffer::new(window.0, window.1);

    let initial = CalibrationParams::from_config(&config.calibration);
    let calibration = if config.calibration.skip {
        log!(logfile, "Calibration skipped: {:?}", initial);
        initial
    } else {
        let font = match config.app.font.as_deref() {
            Some(path) => match UiFont::load(path) {
                Ok(font) => Some(font),
                Err(e) => {
                    log!(logfile, "WARNING: {:#}", e);
                    None
                }
            },
            None => UiFont::system(),
        };
        if font.is_none() {
            log!(logfile, "WARNING: no font available, calibration screen has no labels");
        }
        match run_calibration(&mut renderer, &mut fb, &slot, initial, font, &logfile)? {
            Some(p) => p,
            None => {
                log!(logfile, "Window closed during calibration");
                return Ok(());
            }
        }
    };
    renderer.set_title("Mocap Puppet");

    log!(logfile, "Model: {}", config.model.path);
    let source = YoloPoseSource::new(&config.model.path, &config.model)?;
    let mut worker = InferenceWorker::spawn(source, Duration::from_millis(config.model.timeout_ms));

    let mut pipeline = FramePipeline::from_config(&config, calibration, sprites.sizes());

    let osc = match config.hitbox.osc_target.as_deref() {
        Some(target) => {
            log!(logfile, "Hitbox OSC: {} {}", target, config.hitbox.osc_address);
            Some(OscHitboxSender::new(target, &config.hitbox.osc_address)?)
        }
        None => None,
    };
    let mut osc_error_logged = false;

    let mut fps = FpsCounter::new();

    while renderer.is_open() {
        match pipeline.step(&slot, &mut worker)? {
            StepOutcome::Processed { .. } => fps.inference_count += 1,
            StepOutcome::TimedOut => fps.timeout_count += 1,
            StepOutcome::Failed(e) => log!(logfile, "Inference failed: {:#}", e),
            StepOutcome::NoFrame | StepOutcome::InferenceBusy => {}
        }

        let hitbox = pipeline.hitbox();
        if let Some(ref sender) = osc {
            match sender.send(hitbox) {
                Ok(()) => osc_error_logged = false,
                Err(e) if !osc_error_logged => {
                    log!(logfile, "WARNING: {:#}", e);
                    osc_error_logged = true;
                }
                Err(_) => {}
            }
        }

        match background {
            Some(ref bg) => fb.blit_image(bg, (0, 0)),
            None => fb.fill(BACKGROUND_COLOR),
        }
        pipeline.draw(&mut fb, &sprites, config.app.debug_keypoints);
        renderer.present(&fb)?;

        fps.frame_count += 1;
        let elapsed = fps.timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            log!(logfile,
                "FPS: {:.1} (infer: {}, timeout: {}) | subjects: {} | hitbox: {}",
                fps.frame_count as f32 / elapsed,
                fps.inference_count,
                fps.timeout_count,
                pipeline.arena().len(),
                match hitbox {
                    Some(r) => format!("({}, {}) {}x{}", r.x, r.y, r.width, r.height),
                    None => "none".to_string(),
                },
            );
            fps = FpsCounter::new();
        }
    }

    log!(logfile, "Window closed");
    Ok(())
}
